use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("charm not found: {0}")]
    CharmNotFound(Uuid),

    #[error("watchlist serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("key-value backend failure: {0}")]
    Backend(String),
}
