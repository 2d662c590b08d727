//! HTTP page fetcher with browser-like headers and rate limiting
//!
//! Product sites reject clients that do not look like a browser, so every
//! request carries a desktop `User-Agent` plus the usual `Accept*` headers.
//! One GET per product per cycle: no retries, no caching.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter, clock::DefaultClock, state::{InMemoryState, direct::NotKeyed}};
use reqwest::{Client, header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, HeaderMap, HeaderValue, USER_AGENT}};
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::errors::FetchError;
use crate::domain::services::PageFetcher;
use crate::infrastructure::config::FetcherConfig;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
pub const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// HTTP client configuration for page fetching
#[derive(Debug, Clone, serde::Serialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_seconds: u64,
    /// 0 disables rate limiting
    pub max_requests_per_second: u32,
    pub follow_redirects: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            timeout_seconds: 30,
            max_requests_per_second: 5,
            follow_redirects: true,
        }
    }
}

impl HttpClientConfig {
    pub fn from_fetcher_config(fetcher: &FetcherConfig) -> Self {
        Self {
            user_agent: fetcher.user_agent.clone(),
            accept_language: fetcher.accept_language.clone(),
            timeout_seconds: fetcher.timeout_seconds,
            max_requests_per_second: fetcher.max_requests_per_second,
            follow_redirects: fetcher.follow_redirects,
        }
    }
}

/// [`PageFetcher`] backed by `reqwest`
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Client,
    rate_limiter: Option<Arc<DirectRateLimiter>>,
    config: HttpClientConfig,
}

impl HttpPageFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language).context("Invalid Accept-Language")?,
        );
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        // Accept-Encoding (gzip, br, deflate) is added and decoded by reqwest itself
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .context("Failed to create HTTP client")?;

        let rate_limiter = NonZeroU32::new(config.max_requests_per_second)
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    pub fn from_fetcher_config(fetcher: &FetcherConfig) -> anyhow::Result<Self> {
        Self::new(HttpClientConfig::from_fetcher_config(fetcher))
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    fn validate_url(url: &str) -> Result<Url, FetchError> {
        let parsed = Url::parse(url.trim()).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }

    fn map_request_error(url: &str, error: &reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else {
            FetchError::Request {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let target = Self::validate_url(url)?;

        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        info!("🌐 HTTP GET: {}", target);
        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| Self::map_request_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("❌ HTTP error {}: {}", status, url);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| Self::map_request_error(url, &e))?;

        debug!("Successfully fetched: {} ({} chars)", url, text.len());
        Ok(text)
    }
}
