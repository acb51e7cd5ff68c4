//! Pipeline policy configuration.
//!
//! Every knob has a default, so a missing file or a partial YAML document
//! is fine. Example:
//!
//! ```yaml
//! feeds:
//!   max_articles: 8
//! dedup:
//!   title_similarity_threshold: 0.75
//! chunker:
//!   limit:
//!     unit: words
//!     max: 300
//! ```

use crate::chunker::ChunkLimit;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub http: HttpConfig,
    pub feeds: FeedConfig,
    pub resolver: ResolverConfig,
    pub dedup: DedupConfig,
    pub extract: ExtractConfig,
    pub relevance: RelevanceConfig,
    pub chunker: ChunkerConfig,
    pub summarizer: SummarizerConfig,
    pub qa: QaConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Upper bound on in-flight requests during resolution and extraction.
    pub concurrency: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("awful_topic_news/", env!("CARGO_PKG_VERSION")).to_string(),
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    pub max_articles: usize,
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_articles: 5,
            timeout_secs: 15,
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub max_hops: usize,
    pub timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_hops: 5,
            timeout_secs: 8,
        }
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Jaccard similarity of normalized title words above which two titles are duplicates.
    pub title_similarity_threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            title_similarity_threshold: 0.8,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub timeout_secs: u64,
    /// Bodies thinner than this trigger the next extraction strategy.
    pub min_words: usize,
    /// Pages larger than this are not downloaded in full.
    pub max_page_bytes: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            min_words: 150,
            max_page_bytes: 5 * 1024 * 1024,
        }
    }
}

impl ExtractConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelevanceConfig {
    pub min_words: usize,
    pub keyword_match_threshold: f64,
    pub blocked_domains: Vec<String>,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            min_words: 100,
            keyword_match_threshold: 0.2,
            blocked_domains: [
                "cloudflare.com",
                "facebook.com",
                "linkedin.com",
                "instagram.com",
                "forbes.com/sites",
                "subscribe.bloomberg.com",
                "t.co",
                "youtube.com",
                "msn.com",
            ]
            .iter()
            .map(|d| d.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub limit: ChunkLimit,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            limit: ChunkLimit::words(380),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// awful_aj chat template used for summaries.
    pub template: String,
    pub chunk_summary_words: usize,
    /// Joined chunk summaries longer than this get a compression pass.
    pub compress_above_words: usize,
    pub max_retries: usize,
    pub base_delay_ms: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            template: "news_summarizer".to_string(),
            chunk_summary_words: 200,
            compress_above_words: 250,
            max_retries: 5,
            base_delay_ms: 1000,
        }
    }
}

impl SummarizerConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QaConfig {
    /// awful_aj chat template used for answers.
    pub template: String,
    pub top_n: usize,
    pub min_score: f32,
    pub context_max_words: usize,
    /// Summaries shorter than this get the full text appended as context.
    pub short_summary_words: usize,
    pub embedding_dims: usize,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            template: "news_qa".to_string(),
            top_n: 3,
            min_score: 0.3,
            context_max_words: 800,
            short_summary_words: 50,
            embedding_dims: 512,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file, or defaults when `path` is `None`.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path).await?;
                let config = Self::from_yaml(&raw)?;
                info!(path = %path.display(), "Loaded pipeline configuration");
                Ok(config)
            }
            None => {
                info!("No pipeline configuration given; using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }
}
