//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured headers and timeout
//! - Building the target URL from its query parameters
//! - Retrying failed attempts with exponential backoff

use crate::config::{RetryConfig, TargetConfig};
use crate::logger::CrawlLogger;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A fetch that exhausted its attempts
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url} after {attempts} attempt(s)")]
    Status {
        url: String,
        status: u16,
        attempts: u32,
    },

    #[error("Request to {url} failed after {attempts} attempt(s): {source}")]
    Network {
        url: String,
        attempts: u32,
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Status { attempts, .. } | Self::Network { attempts, .. } => *attempts,
        }
    }
}

/// Failure of a single attempt
#[derive(Debug)]
enum AttemptError {
    Status(u16),
    Network(reqwest::Error),
}

impl AttemptError {
    fn describe(&self) -> String {
        match self {
            Self::Status(status) => format!("HTTP {}", status),
            Self::Network(e) if e.is_timeout() => "Request timeout".to_string(),
            Self::Network(e) if e.is_connect() => format!("Connection failed: {}", e),
            Self::Network(e) => e.to_string(),
        }
    }

    fn into_fetch_error(self, url: &Url, attempts: u32) -> FetchError {
        match self {
            Self::Status(status) => FetchError::Status {
                url: url.to_string(),
                status,
                attempts,
            },
            Self::Network(source) => FetchError::Network {
                url: url.to_string(),
                attempts,
                source,
            },
        }
    }
}

/// A successfully fetched body
#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: String,

    /// Attempts consumed beyond the first one
    pub retry_count: u32,
}

/// Exponential backoff policy
///
/// Attempt `n` failing sleeps `base_delay * backoff_multiplier^(n - 1)`
/// before attempt `n + 1`. There is no ceiling on a single delay; callers
/// that need a wall-clock bound can read it from [`RetryPolicy::total_backoff`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
        }
    }

    /// Delay after the failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(self.base_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    /// Worst-case total sleep across all retries
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts).fold(Duration::ZERO, |total, attempt| {
            total.saturating_add(self.delay_for(attempt))
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Builds an HTTP client with the configured headers and timeout
///
/// Header entries that are not valid HTTP header names or values are skipped
/// with a warning.
///
/// # Example
///
/// ```no_run
/// use stock_crawler::config::TargetConfig;
/// use stock_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&TargetConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &TargetConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();

    for (name, value) in &config.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!("Skipping invalid request header '{}'", name),
        }
    }

    Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds the target URL with its query parameters
pub fn build_target_url(config: &TargetConfig) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&config.url)?;

    if !config.params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &config.params {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}

/// Milliseconds in `delay`, saturating at `u64::MAX`
fn delay_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

/// HTTP GET with bounded exponential-backoff retry
pub struct RetryingFetcher {
    client: Client,
    policy: RetryPolicy,
    logger: Arc<CrawlLogger>,
}

impl RetryingFetcher {
    pub fn new(client: Client, policy: RetryPolicy, logger: Arc<CrawlLogger>) -> Self {
        Self {
            client,
            policy,
            logger,
        }
    }

    /// Fetches `url`, retrying failed attempts
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return body |
    /// | Non-2xx status | Retry after backoff |
    /// | Timeout / connection / body read error | Retry after backoff |
    /// | Attempt == max_attempts | Return `FetchError` |
    ///
    /// # Returns
    ///
    /// * `Ok(Fetched)` - Body and the number of retries it took
    /// * `Err(FetchError)` - Every attempt failed
    pub async fn fetch(&self, url: &Url) -> Result<Fetched, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            self.logger.info(
                format!("Fetching data (attempt {}/{})", attempt, max_attempts),
                Some(json!({ "url": url.as_str() })),
            );

            let error = match self.fetch_once(url).await {
                Ok(body) => {
                    return Ok(Fetched {
                        body,
                        retry_count: attempt - 1,
                    })
                }
                Err(error) => error,
            };

            if attempt >= max_attempts {
                self.logger.error(
                    format!("Fetch failed after {} attempt(s)", attempt),
                    Some(json!({ "url": url.as_str(), "error": error.describe() })),
                );
                return Err(error.into_fetch_error(url, attempt));
            }

            let delay = self.policy.delay_for(attempt);
            let delay_ms = delay_millis(delay);
            self.logger.warning(
                format!("Fetch failed, retrying in {}ms", delay_ms),
                Some(json!({
                    "attempt": attempt,
                    "url": url.as_str(),
                    "delayMs": delay_ms,
                    "error": error.describe(),
                })),
            );

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn fetch_once(&self, url: &Url) -> Result<String, AttemptError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(AttemptError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        response.text().await.map_err(AttemptError::Network)
    }
}
