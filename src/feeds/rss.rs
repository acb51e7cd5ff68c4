//! Minimal RSS 2.0 reader for `channel/item` listings.

use crate::error::Result;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

/// One `<item>` of an RSS channel. Unknown child elements are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RssItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(rename = "pubDate", default)]
    pub pub_date: Option<String>,
}

impl RssItem {
    /// Trimmed title, or `None` when missing or blank.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Parse the items of an RSS 2.0 document.
pub fn parse_items(xml: &str) -> Result<Vec<RssItem>> {
    let rss: Rss = quick_xml::de::from_str(xml)?;
    debug!(count = rss.channel.items.len(), "Parsed RSS items");
    Ok(rss.channel.items)
}
