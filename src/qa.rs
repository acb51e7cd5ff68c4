//! Question answering over stored summaries.
//!
//! Records are ranked against the question by embedding similarity, and
//! each of the top matches is asked the question separately, so every
//! answer is traceable to a single article.

use crate::api::AskAsync;
use crate::config::QaConfig;
use crate::embed::{Embedder, cosine_similarity};
use crate::models::{Answer, SummaryRecord};
use itertools::Itertools;
use std::cmp::Ordering;
use tracing::{debug, info, instrument, warn};

pub const INSUFFICIENT: &str = "Insufficient data.";
pub const ANSWER_FAILED: &str = "(Error while answering)";

/// Top `top_n` records scoring strictly above `min_score`, best first.
#[instrument(
    level = "info",
    skip_all,
    fields(records = records.len(), dims = embedder.dims(), top_n = top_n, min_score = min_score)
)]
pub fn semantic_filter<'a, E: Embedder>(
    embedder: &E,
    question: &str,
    records: &'a [SummaryRecord],
    top_n: usize,
    min_score: f32,
) -> Vec<&'a SummaryRecord> {
    let query = embedder.embed(question);
    let ranked: Vec<(f32, &SummaryRecord)> = records
        .iter()
        .map(|record| (cosine_similarity(&query, &embedder.embed(&record.retrieval_text())), record))
        .filter(|(score, _)| *score > min_score)
        .sorted_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal))
        .take(top_n)
        .collect();

    for (score, record) in &ranked {
        debug!(score, title = %record.title, "Matched record");
    }
    info!(matched = ranked.len(), "Ranked stored summaries");
    ranked.into_iter().map(|(_, record)| record).collect()
}

/// Summary, plus the full text when the summary is short, capped in words.
pub fn build_context(record: &SummaryRecord, config: &QaConfig) -> String {
    let mut context = record.summary.clone();
    let full_text = record.full_text.trim();
    if record.summary.split_whitespace().count() < config.short_summary_words && !full_text.is_empty() {
        context.push_str("\n\n");
        context.push_str(full_text);
    }
    let words: Vec<&str> = context.split_whitespace().collect();
    if words.len() > config.context_max_words {
        words[..config.context_max_words].join(" ")
    } else {
        context
    }
}

pub fn answer_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer the question using only the news article context below. \
         If the context does not contain the answer, reply exactly \"{INSUFFICIENT}\"\n\n\
         Context:\n{context}\n\nQuestion: {question}"
    )
}

/// Ask `question` against each record; failures become [`ANSWER_FAILED`].
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub async fn answer_question<A>(
    asker: &A,
    question: &str,
    records: &[&SummaryRecord],
    config: &QaConfig,
) -> Vec<Answer>
where
    A: AskAsync<Response = String>,
{
    let mut answers = Vec::with_capacity(records.len());
    for record in records {
        let prompt = answer_prompt(question, &build_context(record, config));
        let answer = match asker.ask(&prompt).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => INSUFFICIENT.to_string(),
            Err(e) => {
                warn!(url = %record.url, error = %e, "Answering failed");
                ANSWER_FAILED.to_string()
            }
        };
        answers.push(Answer {
            title: record.title.clone(),
            url: record.url.clone(),
            answer,
        });
    }
    answers
}
