//! Data models that flow between pipeline stages.
//!
//! Each stage consumes the previous stage's type by value and produces its
//! own, so nothing is shared or mutated across stage boundaries:
//!
//! - [`ArticleCandidate`]: raw listing from a feed
//! - [`ResolvedArticle`]: candidate with its canonical (post-redirect) URL
//! - [`ExtractedArticle`]: downloaded body text plus the method that produced it
//! - [`ArticleChunk`]: bounded slice of a body, ready for summarization
//! - [`SummaryRecord`]: what gets persisted per article and topic
//! - [`Answer`]: one per-article answer to a user question

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An article listing as returned by a feed, before URL resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleCandidate {
    pub title: String,
    /// Link as published by the feed; may be a tracking or redirect URL.
    pub raw_url: String,
    /// Name of the feed that produced this candidate (e.g. "Bing").
    pub source_feed: String,
    /// Publication date exactly as the feed wrote it (usually RFC 2822).
    pub published_at: Option<String>,
}

/// A candidate whose URL has been resolved to its final destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArticle {
    pub title: String,
    pub canonical_url: String,
    pub source_feed: String,
    pub published_at: Option<String>,
}

impl ResolvedArticle {
    pub fn from_candidate(candidate: ArticleCandidate, canonical_url: String) -> Self {
        Self {
            title: candidate.title,
            canonical_url,
            source_feed: candidate.source_feed,
            published_at: candidate.published_at,
        }
    }
}

/// Which extraction strategy produced an article body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Structured markup: JSON-LD `articleBody` or `<article>` paragraphs.
    Structured,
    /// Paragraph-density heuristic over the whole page.
    Density,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::Structured => write!(f, "structured"),
            ExtractionMethod::Density => write!(f, "density"),
        }
    }
}

/// Article body text pulled from a downloaded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub canonical_url: String,
    pub title: String,
    pub body_text: String,
    pub extraction_method: ExtractionMethod,
    pub source_feed: String,
    pub published_at: Option<String>,
}

impl ExtractedArticle {
    pub fn word_count(&self) -> usize {
        self.body_text.split_whitespace().count()
    }
}

/// A bounded slice of an article body.
///
/// Chunks of one article are ordered by `chunk_index`; joining their text
/// with single spaces reconstructs the whitespace-normalized body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleChunk {
    /// Canonical URL of the article this chunk belongs to.
    pub article_ref: String,
    pub chunk_index: usize,
    pub text: String,
}

/// An extracted article together with its chunks, ready to summarize.
#[derive(Debug, Clone)]
pub struct PreparedArticle {
    pub article: ExtractedArticle,
    pub chunks: Vec<ArticleChunk>,
}

/// A summarized article as persisted in the per-topic store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub title: String,
    pub topic: String,
    pub url: String,
    pub summary: String,
    pub full_text: String,
    pub source: String,
    #[serde(default)]
    pub published_at: Option<String>,
    pub extraction_method: ExtractionMethod,
    pub chunk_count: usize,
    pub summarized_at: DateTime<Utc>,
}

impl SummaryRecord {
    /// Build a record from a prepared article and its summary.
    pub fn new(topic: &str, prepared: &PreparedArticle, summary: String) -> Self {
        let article = &prepared.article;
        Self {
            title: article.title.clone(),
            topic: topic.to_string(),
            url: article.canonical_url.clone(),
            summary,
            full_text: article.body_text.clone(),
            source: article.source_feed.clone(),
            published_at: article.published_at.clone(),
            extraction_method: article.extraction_method,
            chunk_count: prepared.chunks.len(),
            summarized_at: Utc::now(),
        }
    }

    /// Text used to rank this record against a question.
    pub fn retrieval_text(&self) -> String {
        format!("{}. {}", self.title, self.summary)
    }
}

/// Answer to a user question derived from a single article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub title: String,
    pub url: String,
    pub answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared() -> PreparedArticle {
        PreparedArticle {
            article: ExtractedArticle {
                canonical_url: "https://a.example/x".to_string(),
                title: "Rates hold steady".to_string(),
                body_text: "The central bank held rates.".to_string(),
                extraction_method: ExtractionMethod::Density,
                source_feed: "Yahoo".to_string(),
                published_at: Some("Mon, 06 May 2025 14:30:00 GMT".to_string()),
            },
            chunks: vec![ArticleChunk {
                article_ref: "https://a.example/x".to_string(),
                chunk_index: 0,
                text: "The central bank held rates.".to_string(),
            }],
        }
    }

    #[test]
    fn test_resolved_from_candidate_keeps_metadata() {
        let candidate = ArticleCandidate {
            title: "Title".to_string(),
            raw_url: "https://t.example/r?id=1".to_string(),
            source_feed: "Bing".to_string(),
            published_at: None,
        };
        let resolved = ResolvedArticle::from_candidate(candidate, "https://a.example/x".to_string());
        assert_eq!(resolved.canonical_url, "https://a.example/x");
        assert_eq!(resolved.source_feed, "Bing");
    }

    #[test]
    fn test_summary_record_from_prepared() {
        let record = SummaryRecord::new("economy", &prepared(), "Rates unchanged.".to_string());
        assert_eq!(record.topic, "economy");
        assert_eq!(record.url, "https://a.example/x");
        assert_eq!(record.chunk_count, 1);
        assert_eq!(record.extraction_method, ExtractionMethod::Density);
        assert_eq!(record.retrieval_text(), "Rates hold steady. Rates unchanged.");
    }

    #[test]
    fn test_summary_record_serialization() {
        let record = SummaryRecord::new("economy", &prepared(), "Rates unchanged.".to_string());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"extraction_method\":\"density\""));

        let back: SummaryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_word_count() {
        assert_eq!(prepared().article.word_count(), 5);
    }
}
