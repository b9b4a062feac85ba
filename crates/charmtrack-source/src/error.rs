use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by scrape service (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid source base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
