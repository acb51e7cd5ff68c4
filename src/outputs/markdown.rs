//! Markdown rendering of topic digests and answers.
//!
//! # Digest Layout
//!
//! ```text
//! # Technology
//! _Last updated: 2025-05-06 14:30 UTC · 3 articles_
//!
//! ## Contents
//! - [Headline](#headline)
//!
//! ## Headline
//! **Source:** Bing · **Published:** May 06, 2025 · **Words:** 812 → 196
//! <https://example.com/story>
//!
//! Summary text...
//! ```

use crate::models::{Answer, SummaryRecord};
use crate::utils::slugify_title;
use chrono::{DateTime, Utc};

/// Feed dates are RFC 2822; anything else is shown as written.
pub fn format_published_date(published_at: Option<&str>) -> String {
    match published_at.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => DateTime::parse_from_rfc2822(raw)
            .map(|dt| dt.format("%b %d, %Y").to_string())
            .unwrap_or_else(|_| raw.to_string()),
        None => "N/A".to_string(),
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Render stored records for `topic`; `full_text` appends each article body.
pub fn digest_to_markdown(
    topic: &str,
    records: &[SummaryRecord],
    updated: Option<DateTime<Utc>>,
    full_text: bool,
) -> String {
    let mut md = format!("# {}\n", topic.trim());
    let updated = updated
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "never".to_string());
    md.push_str(&format!("_Last updated: {updated} · {} articles_\n\n", records.len()));

    if records.is_empty() {
        md.push_str("No stored summaries for this topic yet.\n");
        return md;
    }

    md.push_str("## Contents\n");
    for record in records {
        md.push_str(&format!("- [{}](#{})\n", record.title, slugify_title(&record.title)));
    }

    for record in records {
        md.push_str(&format!("\n## {}\n", record.title));
        md.push_str(&format!(
            "**Source:** {} · **Published:** {} · **Words:** {} → {}\n",
            record.source,
            format_published_date(record.published_at.as_deref()),
            word_count(&record.full_text),
            word_count(&record.summary),
        ));
        md.push_str(&format!("<{}>\n\n{}\n", record.url, record.summary.trim()));
        if full_text && !record.full_text.trim().is_empty() {
            md.push_str(&format!("\n<details><summary>Full text</summary>\n\n{}\n\n</details>\n", record.full_text.trim()));
        }
    }
    md
}

pub fn answers_to_markdown(question: &str, answers: &[Answer]) -> String {
    let mut md = format!("# Q: {}\n\n", question.trim());
    if answers.is_empty() {
        md.push_str("No stored article matched this question.\n");
        return md;
    }
    for answer in answers {
        md.push_str(&format!("## {}\n<{}>\n\n{}\n\n", answer.title, answer.url, answer.answer));
    }
    md
}
