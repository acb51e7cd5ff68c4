//! LLM access with exponential backoff.
//!
//! Summaries and answers are produced by an OpenAI-compatible endpoint
//! reached through `awful_aj`. The endpoint is described by awful_aj's
//! `config.yaml`, and the system prompt by a named chat template.
//!
//! - [`AskAsync`]: async "text in, text out" contract
//! - [`TemplateAsk`]: `awful_aj::api::ask` bound to a config and template
//! - [`RetryAsk`]: decorator that retries any [`AskAsync`] with backoff and jitter
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use awful_aj::api::ask;
use awful_aj::{config, config::AwfulJadeConfig, config_dir, template, template::ChatTemplate};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Async LLM interaction.
pub trait AskAsync {
    type Response;

    /// Send `text` as the user message and return the model's reply.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Retries the wrapped [`AskAsync`] with exponential backoff and jitter.
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    /// Delay before retry number `attempt` (1-based), without jitter.
    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.backoff(attempt) + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// `awful_aj::api::ask` bound to a configuration and a chat template.
pub struct TemplateAsk<'a> {
    pub config: &'a AwfulJadeConfig,
    pub template: &'a ChatTemplate,
}

impl<'a> AskAsync for TemplateAsk<'a> {
    type Response = String;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(self.config, text.to_string(), self.template, None, None).await;
        let dt = t0.elapsed();

        match &res {
            Ok(_) => info!(elapsed_ms = dt.as_millis() as u64, "API call succeeded"),
            Err(e) => warn!(elapsed_ms = dt.as_millis() as u64, error = %e, "API call failed"),
        }
        res
    }
}

/// Load awful_aj's endpoint configuration.
///
/// Uses `path` when given, otherwise `config.yaml` in awful_aj's config directory.
#[instrument(level = "info")]
pub fn load_llm_config(path: Option<&Path>) -> Result<AwfulJadeConfig, Box<dyn Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_dir()?.join("config.yaml"),
    };
    let path_str = path.to_str().ok_or("LLM config path is not valid UTF-8")?;
    let conf = config::load_config(path_str)?;
    info!(config_path = path_str, "Loaded LLM configuration");
    Ok(conf)
}

/// Load a named awful_aj chat template.
#[instrument(level = "info")]
pub async fn load_template(name: &str) -> Result<ChatTemplate, Box<dyn Error>> {
    let template = template::load_template(name).await?;
    info!(template = name, "Loaded chat template");
    Ok(template)
}
