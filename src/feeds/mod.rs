//! News feed sources and the fallback feed client.
//!
//! A topic is first looked up on a primary feed; when that feed cannot
//! supply enough usable candidates, the secondary feed is asked for the
//! shortfall. Each source is an ordered strategy behind [`FeedSource`].
//!
//! # Supported Sources
//!
//! | Source | Module | Notes |
//! |--------|--------|-------|
//! | Bing News | [`bing`] | Search RSS; links are `apiclick.aspx` tracking URLs |
//! | Yahoo News | [`yahoo`] | Curated section feeds, search RSS otherwise |

pub mod bing;
pub mod rss;
pub mod yahoo;

use crate::error::{PipelineError, Result};
use crate::models::ArticleCandidate;
use crate::relevance::DomainBlocklist;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub use bing::BingFeed;
pub use yahoo::YahooFeed;

/// A source of article candidates for a topic.
pub trait FeedSource {
    /// Human-readable source name, recorded on every candidate.
    fn name(&self) -> &str;

    /// Fetch up to `max` candidates for `topic`.
    async fn fetch(&self, topic: &str, max: usize) -> Result<Vec<ArticleCandidate>>;
}

/// Download a feed document, mapping any failure to [`PipelineError::FeedUnavailable`].
pub(crate) async fn fetch_feed_xml(
    client: &Client,
    feed: &str,
    url: &str,
    timeout: Duration,
) -> Result<String> {
    let unavailable = |reason: String| PipelineError::FeedUnavailable {
        feed: feed.to_string(),
        reason,
    };
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| unavailable(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(unavailable(format!("HTTP {status}")));
    }
    response.text().await.map_err(|e| unavailable(e.to_string()))
}

/// The secondary feed is asked for this many times `n` candidates, so the
/// shortfall can still be filled after filtering.
const SECONDARY_OVERFETCH: usize = 2;

/// Primary/secondary feed lookup with a blocked-domain filter.
#[derive(Debug)]
pub struct FeedClient<P, S> {
    primary: P,
    secondary: S,
    blocklist: DomainBlocklist,
}

impl<P, S> FeedClient<P, S>
where
    P: FeedSource,
    S: FeedSource,
{
    /// Create a feed client.
    ///
    /// # Arguments
    ///
    /// * `primary` - Feed asked first, for the full `n`
    /// * `secondary` - Feed asked only when the primary comes up short
    /// * `blocklist` - Domains whose links never count as candidates
    pub fn new(primary: P, secondary: S, blocklist: DomainBlocklist) -> Self {
        Self {
            primary,
            secondary,
            blocklist,
        }
    }

    /// Return at most `n` candidates for `topic`.
    ///
    /// # Arguments
    ///
    /// * `topic` - Search topic passed to both feeds
    /// * `n` - Maximum number of candidates
    ///
    /// # Returns
    ///
    /// Primary candidates first, then secondary ones, with blocked and
    /// repeated links removed. Feed errors are logged and count as zero
    /// candidates from that feed, so this never fails.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch(&self, topic: &str, n: usize) -> Vec<ArticleCandidate> {
        if n == 0 {
            return Vec::new();
        }
        let mut seen: HashSet<String> = HashSet::new();

        let mut candidates = self.usable(fetch_soft(&self.primary, topic, n).await, &mut seen, n);
        let primary_count = candidates.len();

        let remaining = n - primary_count;
        if remaining > 0 {
            info!(
                primary = self.primary.name(),
                secondary = self.secondary.name(),
                got = primary_count,
                remaining,
                "Primary feed came up short; asking secondary feed"
            );
            // blocked and already-seen links must not use up shortfall slots
            let extra = fetch_soft(&self.secondary, topic, n.saturating_mul(SECONDARY_OVERFETCH)).await;
            candidates.extend(self.usable(extra, &mut seen, remaining));
        } else {
            debug!(primary = self.primary.name(), "Primary feed provided enough candidates");
        }

        info!(
            topic,
            total = candidates.len(),
            from_primary = primary_count,
            from_secondary = candidates.len() - primary_count,
            "Fetched article candidates"
        );
        candidates
    }

    /// Drop blocked and already-seen links, keeping at most `limit`.
    fn usable(
        &self,
        candidates: Vec<ArticleCandidate>,
        seen: &mut HashSet<String>,
        limit: usize,
    ) -> Vec<ArticleCandidate> {
        let mut kept = Vec::new();
        let mut blocked = 0usize;
        for candidate in candidates {
            if kept.len() >= limit {
                break;
            }
            if !self.blocklist.allows(&candidate.raw_url) {
                blocked += 1;
                continue;
            }
            if seen.insert(candidate.raw_url.clone()) {
                kept.push(candidate);
            }
        }
        if blocked > 0 {
            info!(blocked, "Filtered out candidates on blocked domains");
        }
        kept
    }
}

async fn fetch_soft<F: FeedSource>(feed: &F, topic: &str, max: usize) -> Vec<ArticleCandidate> {
    match feed.fetch(topic, max).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(feed = feed.name(), error = %e, "Feed unavailable; continuing without it");
            Vec::new()
        }
    }
}
