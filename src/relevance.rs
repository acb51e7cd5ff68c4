//! Permissive quality gate for extracted articles.
//!
//! The filter only throws away content that is clearly unusable: pages on
//! blocked domains (social networks, paywalls, consent walls), bodies too
//! short to summarize, and bodies that share almost no vocabulary with
//! their own headline.

use crate::config::RelevanceConfig;
use crate::error::{PipelineError, Result};
use crate::models::ExtractedArticle;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, instrument};
use url::Url;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("word pattern is valid"));

/// Lowercased set of word tokens in `text`.
pub fn word_set(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    WORD.find_iter(&lower).map(|m| m.as_str().to_string()).collect()
}

/// Domain blocklist matched against `host + path` of a URL.
#[derive(Debug, Clone)]
pub struct DomainBlocklist {
    patterns: Vec<String>,
}

impl DomainBlocklist {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// True when the URL does not match any blocked pattern.
    ///
    /// Bare domains match the host itself or any subdomain; patterns
    /// containing a path (e.g. `forbes.com/sites`) match as a prefix of
    /// `host + path`. Unparseable URLs are not allowed.
    pub fn allows(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let host = parsed.host_str().unwrap_or_default().trim_start_matches("www.");
        let full = format!("{}{}", host, parsed.path());

        !self.patterns.iter().any(|pattern| {
            if pattern.contains('/') {
                full.starts_with(pattern.as_str()) || full.contains(&format!(".{pattern}"))
            } else {
                host == pattern || host.ends_with(&format!(".{pattern}"))
            }
        })
    }
}

/// Drops blocked, short, or off-topic articles.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    blocklist: DomainBlocklist,
    min_words: usize,
    keyword_match_threshold: f64,
}

impl RelevanceFilter {
    pub fn new(config: &RelevanceConfig) -> Self {
        Self {
            blocklist: DomainBlocklist::new(config.blocked_domains.clone()),
            min_words: config.min_words,
            keyword_match_threshold: config.keyword_match_threshold,
        }
    }

    pub fn blocklist(&self) -> &DomainBlocklist {
        &self.blocklist
    }

    /// Accept or reject an extracted article for `topic`.
    ///
    /// Keyword overlap is the share of headline words (plus topic words)
    /// that also occur in the body. An article without any headline or
    /// topic words passes on length alone.
    #[instrument(level = "debug", skip_all, fields(url = %article.canonical_url))]
    pub fn check(&self, article: &ExtractedArticle, topic: &str) -> Result<()> {
        let url = &article.canonical_url;
        if !self.blocklist.allows(url) {
            return Err(PipelineError::LowQualityContent {
                url: url.clone(),
                reason: "blocked domain".to_string(),
            });
        }

        let words = article.word_count();
        if words < self.min_words {
            return Err(PipelineError::LowQualityContent {
                url: url.clone(),
                reason: format!("{words} words, need {}", self.min_words),
            });
        }

        let mut keywords = word_set(&article.title);
        keywords.extend(word_set(topic));
        if keywords.is_empty() {
            return Ok(());
        }
        let body = word_set(&article.body_text);
        let common = keywords.intersection(&body).count();
        let score = common as f64 / keywords.len() as f64;
        debug!(score, common, keywords = keywords.len(), "Keyword overlap");

        if score < self.keyword_match_threshold {
            return Err(PipelineError::LowQualityContent {
                url: url.clone(),
                reason: format!("keyword overlap {score:.2} below {}", self.keyword_match_threshold),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionMethod;

    fn article(url: &str, title: &str, body: &str) -> ExtractedArticle {
        ExtractedArticle {
            canonical_url: url.to_string(),
            title: title.to_string(),
            body_text: body.to_string(),
            extraction_method: ExtractionMethod::Structured,
            source_feed: "Bing".to_string(),
            published_at: None,
        }
    }

    fn filler(n: usize) -> String {
        vec!["lorem"; n].join(" ")
    }

    #[test]
    fn test_blocklist() {
        let list = DomainBlocklist::new(RelevanceConfig::default().blocked_domains);
        assert!(list.allows("https://www.reuters.com/world/story"));
        assert!(!list.allows("https://www.facebook.com/some/post"));
        assert!(!list.allows("https://m.youtube.com/watch?v=1"));
        assert!(!list.allows("https://www.forbes.com/sites/someone/2025/01/01/x"));
        assert!(list.allows("https://www.forbes.com/advisor/x"));
        assert!(!list.allows("https://t.co/abc"));
        assert!(list.allows("https://reddit.com/r/x"));
        assert!(!list.allows("not a url"));
    }

    #[test]
    fn test_word_set_is_case_folded() {
        let words = word_set("Fed holds RATES, fed says.");
        assert!(words.contains("fed"));
        assert!(words.contains("rates"));
        assert_eq!(words.len(), 4);
    }

    #[test]
    fn test_rejects_short_body() {
        let filter = RelevanceFilter::new(&RelevanceConfig::default());
        let a = article("https://a.example/x", "Title", &filler(20));
        assert!(matches!(
            filter.check(&a, "anything"),
            Err(PipelineError::LowQualityContent { .. })
        ));
    }

    #[test]
    fn test_rejects_blocked_domain() {
        let filter = RelevanceFilter::new(&RelevanceConfig::default());
        let body = format!("climate {}", filler(200));
        let a = article("https://www.msn.com/en-us/news/x", "Climate", &body);
        assert!(filter.check(&a, "climate").is_err());
    }

    #[test]
    fn test_accepts_on_topic_body() {
        let filter = RelevanceFilter::new(&RelevanceConfig::default());
        let body = format!("Global climate talks resumed in Bonn. {}", filler(150));
        let a = article("https://a.example/x", "Climate talks resume in Bonn", &body);
        assert!(filter.check(&a, "climate").is_ok());
    }

    #[test]
    fn test_rejects_off_topic_body() {
        let filter = RelevanceFilter::new(&RelevanceConfig::default());
        let body = format!("Cookie settings and subscription offers. {}", filler(150));
        let a = article("https://a.example/x", "Climate talks resume in Bonn", &body);
        assert!(filter.check(&a, "climate").is_err());
    }

    #[test]
    fn test_untitled_passes_on_length() {
        let filter = RelevanceFilter::new(&RelevanceConfig::default());
        let a = article("https://a.example/x", "", &filler(120));
        assert!(filter.check(&a, "").is_ok());
    }
}
