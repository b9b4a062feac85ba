use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// One observed for-sale instance of a charm on a single marketplace.
///
/// Produced by the external scraping collaborator and validated at the
/// ingestion boundary (`charmtrack-source`); immutable once received.
/// The aggregator only reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub platform: Platform,
    /// Non-negative price in USD. Full precision is kept internally;
    /// rounding to two decimals happens only at output boundaries.
    pub price: Decimal,
    pub title: Option<String>,
    pub condition: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub seller: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl Listing {
    /// Convenience constructor for the fields aggregation cares about.
    #[must_use]
    pub fn new(platform: Platform, price: Decimal) -> Self {
        Self {
            platform,
            price,
            title: None,
            condition: None,
            url: None,
            image_url: None,
            seller: None,
            scraped_at: Utc::now(),
        }
    }
}
