use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub charms_path: PathBuf,
    /// Base URL of the external marketplace scrape service.
    pub source_base_url: String,
    pub source_request_timeout_secs: u64,
    pub source_user_agent: String,
    pub source_max_retries: u32,
    pub source_retry_backoff_base_secs: u64,
    /// Catalog refresh cadence for the background poller.
    pub refresh_interval_secs: u64,
    pub refresh_enabled: bool,
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_secs: u64,
}
