//! HTTP client for the scrape service's listing search endpoint.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, StatusCode};

use crate::error::SourceError;
use crate::retry::retry_with_backoff;
use crate::types::{RawListing, SearchResponse};

/// Client for `GET {base}/listings?q=<query>` on the marketplace scrape
/// service.
///
/// Rate limiting (429), not-found (404), and other non-2xx responses map to
/// typed errors; transient failures (429, network errors) are retried with
/// exponential backoff up to `max_retries` additional attempts.
pub struct ScrapeClient {
    client: Client,
    /// Maximum number of retry attempts after the first failure.
    max_retries: u32,
    /// Base delay in seconds for exponential backoff.
    backoff_base_secs: u64,
}

impl ScrapeClient {
    /// Creates a `ScrapeClient` with configured timeout, `User-Agent`, and
    /// retry policy. Set `max_retries` to `0` to disable retries.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Searches the scrape service for current listings matching `query`
    /// (typically a charm name), with automatic retry on transient errors.
    ///
    /// # Errors
    ///
    /// - [`SourceError::RateLimited`] after all retries are exhausted on 429.
    /// - [`SourceError::NotFound`] on HTTP 404 (not retried).
    /// - [`SourceError::UnexpectedStatus`] for any other non-2xx status.
    /// - [`SourceError::Http`] for network failures after all retries.
    /// - [`SourceError::Deserialize`] when the body is not valid JSON.
    pub async fn search_listings(
        &self,
        base_url: &str,
        query: &str,
    ) -> Result<Vec<RawListing>, SourceError> {
        let url = Self::search_url(base_url, query)?;

        let response = retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            self.fetch_once(&url)
        })
        .await?;

        Ok(response.listings)
    }

    async fn fetch_once(&self, url: &str) -> Result<SearchResponse, SourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        match status {
            StatusCode::OK => {
                let body = response.bytes().await?;
                serde_json::from_slice(&body).map_err(|source| SourceError::Deserialize {
                    context: url.to_owned(),
                    source,
                })
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);
                Err(SourceError::RateLimited { retry_after_secs })
            }
            StatusCode::NOT_FOUND => Err(SourceError::NotFound {
                url: url.to_owned(),
            }),
            other => Err(SourceError::UnexpectedStatus {
                status: other.as_u16(),
                url: url.to_owned(),
            }),
        }
    }

    fn search_url(base_url: &str, query: &str) -> Result<String, SourceError> {
        let trimmed = base_url.trim_end_matches('/');
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(SourceError::InvalidBaseUrl {
                base_url: base_url.to_owned(),
                reason: "expected an http(s) URL".to_owned(),
            });
        }
        let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC);
        Ok(format!("{trimmed}/listings?q={encoded}"))
    }
}
