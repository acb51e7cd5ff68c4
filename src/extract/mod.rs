//! Article download and body extraction.
//!
//! Each page is downloaded once and handed to an ordered chain of
//! [`ExtractionStrategy`] implementations:
//!
//! 1. [`StructuredExtractor`]: JSON-LD `articleBody`, then `<article>`-style containers
//! 2. [`DensityExtractor`]: every long paragraph outside navigation chrome
//!
//! A strategy that returns nothing, or a body thinner than the configured
//! minimum, hands over to the next one. When every strategy comes back
//! thin, the longest body wins and the relevance filter gets the final say.

pub mod density;
pub mod structured;

use crate::chunker::normalize_whitespace;
use crate::config::ExtractConfig;
use crate::error::{PipelineError, Result};
use crate::models::{ExtractedArticle, ExtractionMethod, ResolvedArticle};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

pub use density::DensityExtractor;
pub use structured::StructuredExtractor;

const UNTITLED: &str = "Untitled Article";

/// Ancestors whose paragraphs are never article text.
const CHROME: &[&str] = &["nav", "header", "footer", "aside", "form", "figure", "noscript"];

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("p selector is valid"));
static OG_TITLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:title"]"#).expect("og:title selector is valid")
});
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("title selector is valid"));

/// One way of pulling body text out of a parsed page.
pub trait ExtractionStrategy: Send + Sync {
    fn method(&self) -> ExtractionMethod;

    /// Body text with paragraphs separated by blank lines, or `None`.
    fn extract(&self, document: &Html) -> Option<String>;
}

/// Whitespace-normalized text of the `<p>` elements under `root` that sit
/// outside navigation chrome and have at least `min_chars` characters.
pub(crate) fn paragraphs_in(root: ElementRef<'_>, min_chars: usize) -> Vec<String> {
    root.select(&PARAGRAPH)
        .filter(|p| {
            !p.ancestors().any(|node| {
                node.value()
                    .as_element()
                    .is_some_and(|el| CHROME.contains(&el.name()))
            })
        })
        .map(|p| normalize_whitespace(&p.text().collect::<String>()))
        .filter(|text| !text.is_empty() && text.chars().count() >= min_chars)
        .collect()
}

/// Headline from `og:title`, falling back to `<title>`.
fn page_title(document: &Html) -> (Option<String>, Option<String>) {
    let og = document
        .select(&OG_TITLE)
        .filter_map(|m| m.value().attr("content"))
        .map(normalize_whitespace)
        .find(|t| !t.is_empty());
    let title = document
        .select(&TITLE)
        .map(|t| normalize_whitespace(&t.text().collect::<String>()))
        .find(|t| !t.is_empty());
    (og, title)
}

pub struct Extractor {
    client: Client,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    min_words: usize,
    max_page_bytes: usize,
    timeout: Duration,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("strategies", &self.strategies.iter().map(|s| s.method()).collect::<Vec<_>>())
            .field("min_words", &self.min_words)
            .field("max_page_bytes", &self.max_page_bytes)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Extractor {
    /// Extractor with the default structured → density chain.
    pub fn new(client: Client, config: &ExtractConfig) -> Self {
        Self::with_strategies(
            client,
            config,
            vec![Box::new(StructuredExtractor), Box::new(DensityExtractor)],
        )
    }

    pub fn with_strategies(
        client: Client,
        config: &ExtractConfig,
        strategies: Vec<Box<dyn ExtractionStrategy>>,
    ) -> Self {
        Self {
            client,
            strategies,
            min_words: config.min_words,
            max_page_bytes: config.max_page_bytes,
            timeout: config.timeout(),
        }
    }

    /// Download and extract one article.
    #[instrument(level = "info", skip_all, fields(url = %article.canonical_url))]
    pub async fn extract(&self, article: &ResolvedArticle) -> Result<ExtractedArticle> {
        let t0 = Instant::now();
        let html = self.download(&article.canonical_url).await?;
        let extracted = self.extract_from_html(article, &html)?;
        info!(
            method = %extracted.extraction_method,
            words = extracted.word_count(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Extracted article"
        );
        Ok(extracted)
    }

    /// Fetch the page body, refusing anything over `max_page_bytes`.
    async fn download(&self, url: &str) -> Result<String> {
        let failure = |reason: String| PipelineError::Extraction {
            url: url.to_string(),
            reason,
        };
        let too_large = || failure(format!("page exceeds {} bytes", self.max_page_bytes));
        let mut response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failure(format!("HTTP {status}")));
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.max_page_bytes as u64)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| failure(e.to_string()))? {
            if body.len() + chunk.len() > self.max_page_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Run the strategy chain over an already-downloaded page.
    pub fn extract_from_html(&self, article: &ResolvedArticle, html: &str) -> Result<ExtractedArticle> {
        let document = Html::parse_document(html);
        let (og_title, html_title) = page_title(&document);
        let feed_title = Some(article.title.trim()).filter(|t| !t.is_empty()).map(str::to_string);
        let title = og_title
            .or(feed_title)
            .or(html_title)
            .unwrap_or_else(|| UNTITLED.to_string());

        let build = |method: ExtractionMethod, body: String| ExtractedArticle {
            canonical_url: article.canonical_url.clone(),
            title: title.clone(),
            body_text: body,
            extraction_method: method,
            source_feed: article.source_feed.clone(),
            published_at: article.published_at.clone(),
        };

        let mut best: Option<(ExtractionMethod, String, usize)> = None;
        for strategy in &self.strategies {
            let method = strategy.method();
            let Some(body) = strategy.extract(&document).filter(|b| !b.trim().is_empty()) else {
                debug!(%method, "Strategy produced no text");
                continue;
            };
            let words = body.split_whitespace().count();
            if words >= self.min_words {
                return Ok(build(method, body));
            }
            debug!(%method, words, min_words = self.min_words, "Strategy produced thin text; trying next");
            if best.as_ref().is_none_or(|(_, _, best_words)| words > *best_words) {
                best = Some((method, body, words));
            }
        }

        best.map(|(method, body, _)| build(method, body))
            .ok_or_else(|| PipelineError::Extraction {
                url: article.canonical_url.clone(),
                reason: "no strategy produced any text".to_string(),
            })
    }
}
