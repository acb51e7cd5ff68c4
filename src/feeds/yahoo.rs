//! Yahoo News RSS, used as the fallback feed.
//!
//! Broad topics that match a Yahoo News section use the curated section
//! feed (`/rss/<section>`); everything else goes through search RSS.

use super::rss::parse_items;
use super::{FeedSource, fetch_feed_xml};
use crate::error::Result;
use crate::models::ArticleCandidate;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, instrument};

pub const YAHOO_NEWS: &str = "https://news.yahoo.com";
pub const YAHOO_NEWS_SEARCH: &str = "https://news.search.yahoo.com/rss";

const CURATED_SECTIONS: &[&str] = &[
    "tech", "world", "science", "business", "health", "us", "politics", "sports",
];

#[derive(Debug, Clone)]
pub struct YahooFeed {
    client: Client,
    sections_base: String,
    search_endpoint: String,
    timeout: Duration,
}

impl YahooFeed {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self::with_endpoints(client, timeout, YAHOO_NEWS, YAHOO_NEWS_SEARCH)
    }

    pub fn with_endpoints(
        client: Client,
        timeout: Duration,
        sections_base: &str,
        search_endpoint: &str,
    ) -> Self {
        Self {
            client,
            sections_base: sections_base.trim_end_matches('/').to_string(),
            search_endpoint: search_endpoint.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Curated section feed when the topic names one, search RSS otherwise.
    pub fn feed_url(&self, topic: &str) -> String {
        let clean = topic.trim().to_lowercase();
        if CURATED_SECTIONS.contains(&clean.as_str()) {
            format!("{}/rss/{}", self.sections_base, clean)
        } else {
            format!("{}?p={}", self.search_endpoint, urlencoding::encode(topic.trim()))
        }
    }
}

impl FeedSource for YahooFeed {
    fn name(&self) -> &str {
        "Yahoo"
    }

    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, topic: &str, max: usize) -> Result<Vec<ArticleCandidate>> {
        let url = self.feed_url(topic);
        let xml = fetch_feed_xml(&self.client, self.name(), &url, self.timeout).await?;
        let items = parse_items(&xml)?;

        let mut seen = HashSet::new();
        let candidates: Vec<ArticleCandidate> = items
            .iter()
            .filter_map(|item| {
                let link = item.link()?;
                seen.insert(link.to_string()).then(|| ArticleCandidate {
                    title: item.title().unwrap_or_default().to_string(),
                    raw_url: link.to_string(),
                    source_feed: self.name().to_string(),
                    published_at: item.pub_date.clone(),
                })
            })
            .take(max)
            .collect();

        info!(entries = items.len(), count = candidates.len(), %url, "Indexed Yahoo News candidates");
        Ok(candidates)
    }
}
