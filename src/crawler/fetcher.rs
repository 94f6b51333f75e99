//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with the configured headers and timeout
//! - GET requests for index and post pages
//! - Retry logic with randomized backoff for transient failures
//! - Error classification (not found, transient, malformed)

use crate::config::HttpConfig;
use crate::{ConfigError, FetchError, FetchResult, HarvestError};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// How many times a request is attempted and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Lower bound of the sleep between attempts
    pub backoff_min: Duration,

    /// Upper bound of the sleep between attempts
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_min: Duration::from_secs(2),
            backoff_max: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    /// Builds the policy described by the `[http]` section
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            backoff_min: Duration::from_millis(config.backoff_min_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms.max(config.backoff_min_ms)),
        }
    }

    /// Picks a sleep duration uniformly from `[backoff_min, backoff_max]`
    pub fn backoff(&self) -> Duration {
        let min = self.backoff_min.as_millis() as u64;
        let max = self.backoff_max.as_millis() as u64;
        if max <= min {
            return self.backoff_min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

/// Builds an HTTP client carrying the configured headers and timeout
///
/// The client is built once per crawl and cloned into every worker; the
/// headers it carries are never modified afterwards.
///
/// # Example
///
/// ```no_run
/// use ptt_harvest::config::HttpConfig;
/// use ptt_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, HarvestError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    let client = Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Fetches pages with the crawl's retry policy
///
/// Cloning is cheap: the underlying client is reference counted.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl PageFetcher {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Builds the client and policy from the `[http]` section
    pub fn from_config(config: &HttpConfig) -> Result<Self, HarvestError> {
        Ok(Self::new(
            build_http_client(config)?,
            RetryPolicy::from_config(config),
        ))
    }

    /// Fetches a page using the policy's attempt budget
    pub async fn fetch(&self, url: &str) -> FetchResult<String> {
        self.fetch_with_retries(url, self.policy.max_attempts).await
    }

    /// Fetches a page and returns its body text
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 404 | Immediate → `NotFound` |
    /// | Other non-2xx status | Retry, then `Transient` |
    /// | Timeout / connection error | Retry, then `Transient` |
    /// | Body cannot be decoded | Immediate → `Malformed` |
    ///
    /// `max_retries` counts every attempt, so a request that always fails
    /// transiently is sent exactly `max_retries` times.
    pub async fn fetch_with_retries(&self, url: &str, max_retries: u32) -> FetchResult<String> {
        let max_attempts = max_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let failure = match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::NOT_FOUND {
                        tracing::error!("404 Not Found for {}, skipping retries", url);
                        return Err(FetchError::NotFound {
                            url: url.to_string(),
                        });
                    }

                    if status.is_success() {
                        return response.text().await.map_err(|e| {
                            tracing::error!("Unreadable body from {}: {}", url, e);
                            FetchError::Malformed {
                                url: url.to_string(),
                                message: e.to_string(),
                            }
                        });
                    }

                    format!("HTTP status {}", status)
                }
                Err(e) => describe_request_error(&e),
            };

            if attempt >= max_attempts {
                tracing::error!(
                    "Failed to fetch {} after {} attempts: {}",
                    url,
                    attempt,
                    failure
                );
                return Err(FetchError::Transient {
                    url: url.to_string(),
                    attempts: attempt,
                    message: failure,
                });
            }

            tracing::warn!("Request failed for {}, attempt {}: {}", url, attempt, failure);
            tokio::time::sleep(self.policy.backoff()).await;
        }
    }
}

/// Classifies a transport-level failure for logging
fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection error: {}", e)
    } else {
        e.to_string()
    }
}
