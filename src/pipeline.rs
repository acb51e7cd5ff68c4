//! The fetch → resolve → dedup → extract → filter → chunk pipeline.
//!
//! [`Pipeline::prepare`] turns a topic into [`PreparedArticle`]s ready for
//! summarization, and [`summarize_prepared`] turns those into
//! [`SummaryRecord`]s. Per-article failures shrink the result set and are
//! never returned to the caller.
//!
//! Resolution and extraction run with at most `http.concurrency` requests
//! in flight. Results keep feed order, so "first seen" in dedup is the
//! feed's ranking regardless of which request finishes first.

use crate::chunker::Chunker;
use crate::config::{PipelineConfig, SummarizerConfig};
use crate::dedup::Deduplicator;
use crate::error::Result;
use crate::extract::Extractor;
use crate::feeds::{BingFeed, FeedClient, FeedSource, YahooFeed};
use crate::models::{ExtractedArticle, PreparedArticle, ResolvedArticle, SummaryRecord};
use crate::relevance::RelevanceFilter;
use crate::resolver::UrlResolver;
use crate::summarize::{Summarizer, digest_article};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

pub struct Pipeline<P, S> {
    feeds: FeedClient<P, S>,
    resolver: UrlResolver,
    dedup: Deduplicator,
    extractor: Extractor,
    filter: RelevanceFilter,
    chunker: Chunker,
    concurrency: usize,
}

impl Pipeline<BingFeed, YahooFeed> {
    /// Bing News as primary feed, Yahoo News as secondary.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let client = Client::builder().user_agent(&config.http.user_agent).build()?;
        let timeout = config.feeds.timeout();
        Self::with_feeds(
            BingFeed::new(client.clone(), timeout),
            YahooFeed::new(client.clone(), timeout),
            client,
            config,
        )
    }
}

impl<P, S> Pipeline<P, S>
where
    P: FeedSource,
    S: FeedSource,
{
    pub fn with_feeds(primary: P, secondary: S, client: Client, config: &PipelineConfig) -> Result<Self> {
        let filter = RelevanceFilter::new(&config.relevance);
        Ok(Self {
            feeds: FeedClient::new(primary, secondary, filter.blocklist().clone()),
            resolver: UrlResolver::new(
                &config.http.user_agent,
                config.resolver.max_hops,
                config.resolver.timeout(),
            )?,
            dedup: Deduplicator::new(config.dedup.title_similarity_threshold),
            extractor: Extractor::new(client, &config.extract),
            filter,
            chunker: Chunker::new(config.chunker.limit),
            concurrency: config.http.concurrency.max(1),
        })
    }

    /// Fetch up to `n` articles for `topic` and prepare them for summarization.
    ///
    /// # Arguments
    ///
    /// * `topic` - Search topic, also used for the relevance check
    /// * `n` - Maximum number of feed candidates
    /// * `known` - Canonical URLs already stored; skipped before download
    ///
    /// # Returns
    ///
    /// Chunked articles in feed order. Articles that fail any stage are
    /// logged and left out.
    #[instrument(level = "info", skip(self, known), fields(known = known.len()))]
    pub async fn prepare(&self, topic: &str, n: usize, known: &HashSet<String>) -> Vec<PreparedArticle> {
        let t0 = Instant::now();
        let candidates = self.feeds.fetch(topic, n).await;

        let resolved: Vec<ResolvedArticle> = stream::iter(candidates)
            .map(|candidate| self.resolver.resolve_candidate(candidate))
            .buffered(self.concurrency)
            .collect()
            .await;
        let unique = self.dedup.dedup(resolved);

        let fresh: Vec<ResolvedArticle> = unique
            .into_iter()
            .filter(|article| {
                if known.contains(&article.canonical_url) {
                    debug!(url = %article.canonical_url, "Already stored; skipping");
                    false
                } else if !self.filter.blocklist().allows(&article.canonical_url) {
                    debug!(url = %article.canonical_url, "Resolved to a blocked domain; skipping");
                    false
                } else {
                    true
                }
            })
            .collect();
        info!(count = fresh.len(), "Articles to extract");

        let extracted: Vec<Result<ExtractedArticle>> = stream::iter(fresh.iter())
            .map(|article| self.extractor.extract(article))
            .buffered(self.concurrency)
            .collect()
            .await;

        let prepared: Vec<PreparedArticle> = extracted
            .into_iter()
            .filter_map(|result| self.accept(result, topic))
            .collect();

        info!(
            prepared = prepared.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Pipeline run complete"
        );
        prepared
    }

    fn accept(&self, result: Result<ExtractedArticle>, topic: &str) -> Option<PreparedArticle> {
        let article = match result {
            Ok(article) => article,
            Err(e) => {
                if e.is_recoverable() {
                    warn!(error = %e, "Dropping article");
                } else {
                    error!(error = %e, "Unexpected error while extracting; dropping article");
                }
                return None;
            }
        };
        if let Err(e) = self.filter.check(&article, topic) {
            debug!(error = %e, "Filtered out article");
            return None;
        }
        let chunks = self.chunker.chunk(&article.canonical_url, &article.body_text);
        if chunks.is_empty() {
            return None;
        }
        Some(PreparedArticle { article, chunks })
    }

    /// Re-chunk a stored record's full text.
    pub fn rechunk(&self, record: &SummaryRecord) -> PreparedArticle {
        let article = ExtractedArticle {
            canonical_url: record.url.clone(),
            title: record.title.clone(),
            body_text: record.full_text.clone(),
            extraction_method: record.extraction_method,
            source_feed: record.source.clone(),
            published_at: record.published_at.clone(),
        };
        let chunks = self.chunker.chunk(&article.canonical_url, &article.body_text);
        PreparedArticle { article, chunks }
    }
}

/// Summarize prepared articles in order, skipping those that fail.
#[instrument(level = "info", skip_all, fields(topic = %topic, articles = prepared.len()))]
pub async fn summarize_prepared<Z: Summarizer>(
    summarizer: &Z,
    topic: &str,
    prepared: &[PreparedArticle],
    config: &SummarizerConfig,
) -> Vec<SummaryRecord> {
    let mut records = Vec::with_capacity(prepared.len());
    for article in prepared {
        match digest_article(summarizer, article, config).await {
            Ok(summary) => records.push(SummaryRecord::new(topic, article, summary)),
            Err(e) => warn!(url = %article.article.canonical_url, error = %e, "Skipping unsummarized article"),
        }
    }
    info!(summarized = records.len(), "Summarization complete");
    records
}
