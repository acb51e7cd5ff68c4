//! Error taxonomy for the fetch → extract → summarize pipeline.
//!
//! Most variants are recoverable and never abort a run: the pipeline logs
//! them and shrinks its result set instead.
//!
//! | Variant | Recovery |
//! |---------|----------|
//! | [`PipelineError::FeedUnavailable`] | fall back to the secondary feed |
//! | [`PipelineError::RedirectResolution`] | keep the original URL |
//! | [`PipelineError::Extraction`] | try the fallback extractor, else drop |
//! | [`PipelineError::LowQualityContent`] | drop the article silently |
//! | [`PipelineError::Summarization`] | skip the chunk or article |

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("feed {feed} unavailable: {reason}")]
    FeedUnavailable { feed: String, reason: String },

    #[error("could not resolve redirects for {url}: {reason}")]
    RedirectResolution { url: String, reason: String },

    #[error("extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },

    #[error("low quality content at {url}: {reason}")]
    LowQualityContent { url: String, reason: String },

    #[error("summarization failed: {0}")]
    Summarization(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Errors the pipeline recovers from by dropping or degrading a single item.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::FeedUnavailable { .. }
                | PipelineError::RedirectResolution { .. }
                | PipelineError::Extraction { .. }
                | PipelineError::LowQualityContent { .. }
                | PipelineError::Summarization(_)
        )
    }
}
