//! Chunk-wise summarization of prepared articles.
//!
//! The language model itself is external; this module only decides what
//! to send it. Each chunk is summarized on its own, the partial summaries
//! are joined, and an over-long result gets one compression pass.

use crate::api::AskAsync;
use crate::config::SummarizerConfig;
use crate::error::{PipelineError, Result};
use crate::models::PreparedArticle;
use crate::utils::truncate_for_log;
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, instrument, warn};

/// Text in, summary out.
pub trait Summarizer {
    /// Summarize `text` in roughly `target_words` words.
    async fn summarize(&self, text: &str, target_words: usize) -> Result<String>;
}

/// Summarizer backed by an [`AskAsync`] language model.
#[derive(Debug)]
pub struct LlmSummarizer<A> {
    asker: A,
}

impl<A> LlmSummarizer<A> {
    pub fn new(asker: A) -> Self {
        Self { asker }
    }
}

pub fn summary_prompt(text: &str, target_words: usize) -> String {
    format!(
        "You are a professional news analyst. Write a concise, factual summary of the text below \
         in around {target_words} words. Avoid repeating any sentences or phrases. Focus on the most \
         important facts, events, and implications.\n\n{text}"
    )
}

impl<A> Summarizer for LlmSummarizer<A>
where
    A: AskAsync<Response = String>,
{
    #[instrument(level = "debug", skip_all, fields(bytes = text.len(), target_words = target_words))]
    async fn summarize(&self, text: &str, target_words: usize) -> Result<String> {
        let reply = self
            .asker
            .ask(&summary_prompt(text, target_words))
            .await
            .map_err(|e| PipelineError::Summarization(e.to_string()))?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(PipelineError::Summarization("model returned an empty summary".to_string()));
        }
        debug!(preview = %truncate_for_log(reply, 120), "Model summary");
        Ok(reply.to_string())
    }
}

/// Memoizes another summarizer by `(text, target_words)`.
///
/// Re-summarizing an unchanged article, or a chunk shared by two
/// articles, costs no model call.
#[derive(Debug)]
pub struct CachedSummarizer<S> {
    inner: S,
    cache: Mutex<HashMap<(String, usize), String>>,
}

impl<S> CachedSummarizer<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of memoized summaries.
    pub fn cached_entries(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<S: Summarizer> Summarizer for CachedSummarizer<S> {
    async fn summarize(&self, text: &str, target_words: usize) -> Result<String> {
        let key = (text.to_string(), target_words);
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(summary) = cached {
            debug!("Summary cache hit");
            return Ok(summary);
        }

        let summary = self.inner.summarize(text, target_words).await?;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, summary.clone());
        Ok(summary)
    }
}

/// Drop blank lines and lines already seen, trimming the rest.
pub fn clean_repetitions(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .unique()
        .join("\n")
}

/// Summarize a prepared article chunk by chunk.
///
/// Chunks that fail are skipped; the article fails only when every chunk
/// does. A joined summary longer than `compress_above_words` is
/// summarized once more, keeping the joined text if that pass fails.
#[instrument(level = "info", skip_all, fields(url = %prepared.article.canonical_url, chunks = prepared.chunks.len()))]
pub async fn digest_article<S: Summarizer>(
    summarizer: &S,
    prepared: &PreparedArticle,
    config: &SummarizerConfig,
) -> Result<String> {
    let mut partials = Vec::with_capacity(prepared.chunks.len());
    for chunk in &prepared.chunks {
        let cleaned = clean_repetitions(&chunk.text);
        match summarizer.summarize(&cleaned, config.chunk_summary_words).await {
            Ok(summary) => partials.push(summary),
            Err(e) => warn!(chunk = chunk.chunk_index, error = %e, "Chunk summarization failed; skipping chunk"),
        }
    }
    if partials.is_empty() {
        return Err(PipelineError::Summarization(format!(
            "no chunk of {} could be summarized",
            prepared.article.canonical_url
        )));
    }

    let combined = partials.join(" ");
    let words = combined.split_whitespace().count();
    if words <= config.compress_above_words {
        info!(words, "Summarized article");
        return Ok(combined);
    }

    match summarizer.summarize(&combined, config.compress_above_words).await {
        Ok(compressed) => {
            info!(before = words, after = compressed.split_whitespace().count(), "Compressed article summary");
            Ok(compressed)
        }
        Err(e) => {
            warn!(error = %e, "Compression pass failed; keeping joined chunk summaries");
            Ok(combined)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::tests::ScriptedAsk;
    use crate::models::{ArticleChunk, ExtractedArticle, ExtractionMethod};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Summarizer that returns the first `keep` words and can fail on demand.
    #[derive(Debug, Default)]
    pub(crate) struct FakeSummarizer {
        pub keep: usize,
        pub fail_containing: Option<String>,
        pub calls: AtomicUsize,
    }

    impl Summarizer for FakeSummarizer {
        async fn summarize(&self, text: &str, _target_words: usize) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(marker) = &self.fail_containing {
                if text.contains(marker.as_str()) {
                    return Err(PipelineError::Summarization("scripted failure".to_string()));
                }
            }
            Ok(text.split_whitespace().take(self.keep).join(" "))
        }
    }

    fn prepared(chunks: &[&str]) -> PreparedArticle {
        PreparedArticle {
            article: ExtractedArticle {
                canonical_url: "https://a.example/x".to_string(),
                title: "T".to_string(),
                body_text: chunks.join(" "),
                extraction_method: ExtractionMethod::Structured,
                source_feed: "Bing".to_string(),
                published_at: None,
            },
            chunks: chunks
                .iter()
                .enumerate()
                .map(|(i, text)| ArticleChunk {
                    article_ref: "https://a.example/x".to_string(),
                    chunk_index: i,
                    text: text.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_clean_repetitions() {
        let text = "Line one\n  Line two  \n\nLine one\nLine three\nLine two";
        assert_eq!(clean_repetitions(text), "Line one\nLine two\nLine three");
    }

    #[test]
    fn test_prompt_mentions_target() {
        let prompt = summary_prompt("Body.", 120);
        assert!(prompt.contains("around 120 words"));
        assert!(prompt.ends_with("\n\nBody."));
    }

    #[tokio::test]
    async fn test_llm_summarizer_trims_and_rejects_empty() {
        let ok = LlmSummarizer::new(ScriptedAsk {
            reply: "  A summary.  ".to_string(),
            ..Default::default()
        });
        assert_eq!(ok.summarize("text", 50).await.unwrap(), "A summary.");

        let empty = LlmSummarizer::new(ScriptedAsk {
            reply: "   ".to_string(),
            ..Default::default()
        });
        assert!(empty.summarize("text", 50).await.is_err());
    }

    #[tokio::test]
    async fn test_cache_avoids_second_call() {
        let cached = CachedSummarizer::new(FakeSummarizer {
            keep: 2,
            ..Default::default()
        });
        assert_eq!(cached.summarize("a b c", 10).await.unwrap(), "a b");
        assert_eq!(cached.summarize("a b c", 10).await.unwrap(), "a b");
        cached.summarize("a b c", 20).await.unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cached.cached_entries(), 2);
    }

    #[tokio::test]
    async fn test_digest_joins_chunk_summaries() {
        let fake = FakeSummarizer {
            keep: 2,
            ..Default::default()
        };
        let summary = digest_article(&fake, &prepared(&["a b c", "d e f"]), &SummarizerConfig::default())
            .await
            .unwrap();
        assert_eq!(summary, "a b d e");
    }

    #[tokio::test]
    async fn test_digest_skips_failed_chunks() {
        let fake = FakeSummarizer {
            keep: 3,
            fail_containing: Some("poison".to_string()),
            ..Default::default()
        };
        let summary = digest_article(&fake, &prepared(&["poison x", "good words here"]), &SummarizerConfig::default())
            .await
            .unwrap();
        assert_eq!(summary, "good words here");
    }

    #[tokio::test]
    async fn test_digest_fails_when_every_chunk_fails() {
        let fake = FakeSummarizer {
            keep: 3,
            fail_containing: Some("poison".to_string()),
            ..Default::default()
        };
        let err = digest_article(&fake, &prepared(&["poison a", "poison b"]), &SummarizerConfig::default()).await;
        assert!(matches!(err, Err(PipelineError::Summarization(_))));
    }

    #[tokio::test]
    async fn test_digest_compresses_long_summaries() {
        let fake = FakeSummarizer {
            keep: 4,
            ..Default::default()
        };
        let config = SummarizerConfig {
            compress_above_words: 6,
            ..Default::default()
        };
        let chunks = ["a1 a2 a3 a4 a5", "b1 b2 b3 b4 b5"];
        let summary = digest_article(&fake, &prepared(&chunks), &config).await.unwrap();
        // two partials of 4 words exceed 6, so the joined text is summarized again
        assert_eq!(summary, "a1 a2 a3 a4");
        assert_eq!(fake.calls.load(Ordering::SeqCst), 3);
    }
}
