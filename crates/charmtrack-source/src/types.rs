//! Wire types for the scrape service's search endpoint.
//!
//! The upstream collectors are an evolving fleet; field presence and
//! platform casing vary across them, so everything descriptive is optional
//! and `platform` stays a free string until ingestion normalizes it.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One raw listing exactly as the scrape service returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawListing {
    /// Free-form marketplace identifier, e.g. `"ebay"`, `"Ebay"`, `"eBay"`.
    pub platform: String,
    /// Price as a float; NaN/negative values do occur in scraped data and
    /// are filtered at ingestion.
    pub price: f64,
    pub title: Option<String>,
    pub condition: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub seller: Option<String>,
    pub scraped_at: Option<DateTime<Utc>>,
}

/// Envelope for `GET /listings?q=...`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub listings: Vec<RawListing>,
}
