//! Duplicate removal by canonical URL and near-identical headline.
//!
//! Feeds frequently syndicate the same story under slightly different
//! headlines ("Fed holds rates steady" vs "Fed Holds Rates Steady -
//! Reuters"), so titles are compared after normalization using Jaccard
//! similarity over their word sets.

use crate::models::ResolvedArticle;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, instrument};

/// Case-fold, strip punctuation, and collapse whitespace.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Jaccard similarity of the word sets of two normalized titles.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a: BTreeSet<&str> = a.split_whitespace().collect();
    let b: BTreeSet<&str> = b.split_whitespace().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let common = a.intersection(&b).count();
    let union = a.union(&b).count();
    common as f64 / union as f64
}

/// Drops repeated stories while keeping feed order.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    threshold: f64,
}

impl Deduplicator {
    /// Create a deduplicator.
    ///
    /// # Arguments
    ///
    /// * `threshold` - Title similarity (Jaccard, `0.0..=1.0`) above which
    ///   two headlines are treated as the same story
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Remove duplicates, keeping the first occurrence of each story.
    #[instrument(level = "info", skip_all, fields(input = articles.len()))]
    pub fn dedup(&self, articles: Vec<ResolvedArticle>) -> Vec<ResolvedArticle> {
        let total = articles.len();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut kept_titles: Vec<String> = Vec::new();
        let mut kept = Vec::new();

        for article in articles {
            if seen_urls.contains(&article.canonical_url) {
                debug!(url = %article.canonical_url, "Duplicate canonical URL");
                continue;
            }
            let title = normalize_title(&article.title);
            if let Some(existing) = kept_titles
                .iter()
                .find(|t| title_similarity(t, &title) > self.threshold)
            {
                debug!(url = %article.canonical_url, title = %title, matched = %existing, "Near-duplicate title");
                continue;
            }
            seen_urls.insert(article.canonical_url.clone());
            kept_titles.push(title);
            kept.push(article);
        }

        info!(input = total, kept = kept.len(), "Deduplicated articles");
        kept
    }
}
