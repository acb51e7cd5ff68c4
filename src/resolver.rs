//! Redirect and tracking-link resolution.
//!
//! Resolution is best effort: a URL that cannot be followed (loop, too
//! many hops, timeout, network error) resolves to itself. Automatic
//! redirects are disabled on the client so every hop is counted and bounded
//! by its own timeout.

use crate::error::PipelineError;
use crate::models::{ArticleCandidate, ResolvedArticle};
use reqwest::header::LOCATION;
use reqwest::{Client, redirect};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

/// Unwrap a tracking link that carries its destination in the URL itself.
///
/// Handles `?url=<encoded>` query parameters and Yahoo's
/// `/RU=<encoded>/RK=...` path segments. Returns `None` when `raw` is not a
/// recognized wrapper.
pub fn unwrap_tracking_url(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;

    let from_query = parsed
        .query_pairs()
        .find(|(key, _)| key.eq_ignore_ascii_case("url"))
        .map(|(_, value)| value.into_owned());

    let from_path = || {
        let path = parsed.path();
        let start = path.find("/RU=")? + "/RU=".len();
        let end = path[start..].find("/R").map_or(path.len(), |i| start + i);
        urlencoding::decode(&path[start..end]).ok().map(|s| s.into_owned())
    };

    let target = from_query.or_else(from_path)?;
    let target = Url::parse(&target).ok()?;
    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}

/// Follows redirects by hand so every hop is counted and timed.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    client: Client,
    max_hops: usize,
    timeout: Duration,
}

impl UrlResolver {
    /// Build a resolver with its own non-redirecting HTTP client.
    ///
    /// # Arguments
    ///
    /// * `user_agent` - `User-Agent` header sent on every hop
    /// * `max_hops` - Redirects followed before giving up
    /// * `timeout` - Limit for each individual request
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(user_agent: &str, max_hops: usize, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            max_hops,
            timeout,
        })
    }

    /// Resolve a candidate into a [`ResolvedArticle`].
    pub async fn resolve_candidate(&self, candidate: ArticleCandidate) -> ResolvedArticle {
        let canonical = self.resolve(&candidate.raw_url).await;
        ResolvedArticle::from_candidate(candidate, canonical)
    }

    /// Final destination of `raw_url`.
    ///
    /// # Arguments
    ///
    /// * `raw_url` - Feed link, possibly a tracking wrapper
    ///
    /// # Returns
    ///
    /// The URL after the last redirect. On a loop, too many hops, a
    /// timeout or a network error, the unwrapped link (or `raw_url` itself)
    /// is returned instead. Takes at most `(max_hops + 1) * timeout`.
    #[instrument(level = "debug", skip(self))]
    pub async fn resolve(&self, raw_url: &str) -> String {
        let start = unwrap_tracking_url(raw_url).unwrap_or_else(|| raw_url.to_string());
        match self.follow(&start).await {
            Ok(url) => {
                if url != raw_url {
                    debug!(from = %raw_url, to = %url, "Resolved URL");
                }
                url
            }
            Err(e) => {
                warn!(error = %e, url = %start, "Redirect resolution failed; keeping original URL");
                start
            }
        }
    }

    async fn follow(&self, start: &str) -> Result<String, PipelineError> {
        let failure = |reason: String| PipelineError::RedirectResolution {
            url: start.to_string(),
            reason,
        };
        let t0 = Instant::now();
        let mut current = Url::parse(start)?;
        let mut visited: HashSet<String> = HashSet::new();

        for hop in 0..=self.max_hops {
            if !visited.insert(current.to_string()) {
                return Err(failure(format!("redirect loop at {current}")));
            }
            let response = self
                .client
                .get(current.clone())
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| failure(e.to_string()))?;

            if !response.status().is_redirection() {
                debug!(hops = hop, elapsed_ms = t0.elapsed().as_millis() as u64, "Reached final URL");
                return Ok(current.to_string());
            }
            let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
            else {
                return Ok(current.to_string());
            };
            current = current.join(location)?;
        }

        Err(failure(format!("more than {} redirects", self.max_hops)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(max_hops: usize) -> UrlResolver {
        UrlResolver::new("test-agent", max_hops, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_unwrap_query_parameter() {
        assert_eq!(
            unwrap_tracking_url("http://www.bing.com/news/apiclick.aspx?ref=FexRss&url=https%3a%2f%2fa.example%2fx&c=9"),
            Some("https://a.example/x".to_string())
        );
    }

    #[test]
    fn test_unwrap_yahoo_path_segment() {
        assert_eq!(
            unwrap_tracking_url("https://r.search.yahoo.com/_ylt=abc/RV=2/RE=1/RO=10/RU=https%3a%2f%2fa.example%2fstory/RK=2/RS=xyz-"),
            Some("https://a.example/story".to_string())
        );
    }

    #[test]
    fn test_plain_url_is_not_a_wrapper() {
        assert_eq!(unwrap_tracking_url("https://a.example/story?id=3"), None);
    }

    #[tokio::test]
    async fn test_follows_redirect_chain() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let _a = server
            .mock("GET", "/a")
            .with_status(301)
            .with_header("location", "/b")
            .create_async()
            .await;
        let _b = server
            .mock("GET", "/b")
            .with_status(302)
            .with_header("location", &format!("{base}/final"))
            .create_async()
            .await;
        let _final = server
            .mock("GET", "/final")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let resolved = resolver(5).resolve(&format!("{base}/a")).await;
        assert_eq!(resolved, format!("{base}/final"));
    }

    #[tokio::test]
    async fn test_loop_returns_original() {
        let mut server = mockito::Server::new_async().await;
        let _x = server
            .mock("GET", "/x")
            .with_status(302)
            .with_header("location", "/y")
            .create_async()
            .await;
        let _y = server
            .mock("GET", "/y")
            .with_status(302)
            .with_header("location", "/x")
            .create_async()
            .await;

        let start = format!("{}/x", server.url());
        assert_eq!(resolver(10).resolve(&start).await, start);
    }

    #[tokio::test]
    async fn test_hop_limit_returns_original() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        for i in 0..4 {
            let mock = server
                .mock("GET", format!("/h{i}").as_str())
                .with_status(302)
                .with_header("location", &format!("/h{}", i + 1))
                .create_async()
                .await;
            mocks.push(mock);
        }
        let start = format!("{}/h0", server.url());
        assert_eq!(resolver(2).resolve(&start).await, start);
    }

    #[tokio::test]
    async fn test_slow_hop_times_out_to_original() {
        let mut server = mockito::Server::new_async().await;
        let _hop = server
            .mock("GET", "/hop")
            .with_status(302)
            .with_header("location", "/slow")
            .create_async()
            .await;
        let _slow = server
            .mock("GET", "/slow")
            .with_status(200)
            .with_body_from_request(|_| {
                std::thread::sleep(Duration::from_millis(1500));
                b"late".to_vec()
            })
            .create_async()
            .await;

        let max_hops = 2;
        let timeout = Duration::from_millis(200);
        let r = UrlResolver::new("test-agent", max_hops, timeout).unwrap();
        let start = format!("{}/hop", server.url());
        let t0 = Instant::now();
        assert_eq!(r.resolve(&start).await, start);
        assert!(t0.elapsed() < timeout * (max_hops as u32 + 1));
    }

    #[tokio::test]
    async fn test_unreachable_host_returns_unwrapped() {
        let r = UrlResolver::new("test-agent", 3, Duration::from_millis(500)).unwrap();
        let raw = "http://www.bing.com/news/apiclick.aspx?url=http%3a%2f%2f127.0.0.1%3a9%2fstory";
        assert_eq!(r.resolve(raw).await, "http://127.0.0.1:9/story");
    }
}
