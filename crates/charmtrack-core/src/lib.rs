pub mod app_config;
pub mod catalog;
pub mod charm;
pub mod config;
pub mod history;
pub mod listing;
pub mod platform;
pub mod pricing;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::{load_charms, CharmConfig, CharmsFile};
pub use charm::{Charm, CharmStatus, Material, BASELINE_POPULARITY};
pub use config::{load_app_config, load_app_config_from_env};
pub use history::{PriceChanges, PricePoint};
pub use listing::Listing;
pub use platform::Platform;
pub use pricing::{
    best_deal, compute_deltas, rollup, summarize, BestDealScope, MarketplaceSummary, PriceBoard,
    PriceDelta, PriceRollup, SummaryKey,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read charms file at {path}: {source}")]
    CharmsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse charms file: {0}")]
    CharmsFileParse(#[from] serde_yaml::Error),

    #[error("charms file validation failed: {0}")]
    Validation(String),
}
