//! Bing News search RSS.
//!
//! Bing wraps every article link in a click-tracking URL such as
//! `http://www.bing.com/news/apiclick.aspx?ref=FexRss&aid=&tid=...&url=https%3a%2f%2fexample.com%2fstory&c=...`.
//! The real destination lives in the `url` query parameter; items without
//! one are skipped.

use super::rss::parse_items;
use super::{FeedSource, fetch_feed_xml};
use crate::error::Result;
use crate::models::ArticleCandidate;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

pub const BING_NEWS_SEARCH: &str = "https://www.bing.com/news/search";

#[derive(Debug, Clone)]
pub struct BingFeed {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl BingFeed {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self::with_endpoint(client, timeout, BING_NEWS_SEARCH)
    }

    pub fn with_endpoint(client: Client, timeout: Duration, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn search_url(&self, topic: &str) -> String {
        format!("{}?q={}&format=rss", self.endpoint, urlencoding::encode(topic.trim()))
    }
}

/// Pull the article URL out of a Bing click-tracking link.
pub fn decode_tracking_link(link: &str) -> Option<String> {
    let parsed = Url::parse(link).ok()?;
    let target = parsed
        .query_pairs()
        .find(|(key, _)| key.eq_ignore_ascii_case("url"))
        .map(|(_, value)| value.into_owned())?;
    let target = Url::parse(&target).ok()?;
    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}

impl FeedSource for BingFeed {
    fn name(&self) -> &str {
        "Bing"
    }

    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, topic: &str, max: usize) -> Result<Vec<ArticleCandidate>> {
        let url = self.search_url(topic);
        let xml = fetch_feed_xml(&self.client, self.name(), &url, self.timeout).await?;
        let items = parse_items(&xml)?;

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for item in &items {
            if candidates.len() >= max {
                break;
            }
            let Some(link) = item.link() else { continue };
            let Some(target) = decode_tracking_link(link) else {
                debug!(%link, "Bing item without a target url; skipping");
                continue;
            };
            if !seen.insert(target.clone()) {
                continue;
            }
            candidates.push(ArticleCandidate {
                title: item.title().unwrap_or_default().to_string(),
                raw_url: target,
                source_feed: self.name().to_string(),
                published_at: item.pub_date.clone(),
            });
        }

        info!(entries = items.len(), count = candidates.len(), "Indexed Bing News candidates");
        Ok(candidates)
    }
}
