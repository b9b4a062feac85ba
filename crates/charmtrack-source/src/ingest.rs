//! Ingestion boundary: raw scrape output to validated core listings.
//!
//! The aggregator assumes well-formed, non-negative finite prices and a
//! closed platform set; this is the one place that enforces it. Rejected
//! rows are dropped with a diagnostic, never propagated as errors, because
//! malformed rows are expected noise from an evolving collector fleet.

use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use charmtrack_core::{Listing, Platform};

use crate::types::RawListing;

/// Validates and normalizes raw listings.
///
/// Drops rows with an unrecognized platform, a non-finite price, or a
/// negative price. Platform matching is case-insensitive; output listings
/// carry the canonical [`Platform`] variant.
#[must_use]
pub fn ingest_listings(raw: Vec<RawListing>) -> Vec<Listing> {
    raw.into_iter().filter_map(ingest_one).collect()
}

fn ingest_one(raw: RawListing) -> Option<Listing> {
    let Some(platform) = Platform::parse(&raw.platform) else {
        tracing::debug!(platform = %raw.platform, "dropping listing from unrecognized marketplace");
        return None;
    };

    if !raw.price.is_finite() {
        tracing::warn!(%platform, price = raw.price, "dropping listing with non-finite price");
        return None;
    }

    let price = Decimal::from_f64(raw.price)?.round_dp(2);
    if price < Decimal::ZERO {
        tracing::warn!(%platform, %price, "dropping listing with negative price");
        return None;
    }

    Some(Listing {
        platform,
        price,
        title: raw.title,
        condition: raw.condition,
        url: raw.url,
        image_url: raw.image_url,
        seller: raw.seller,
        scraped_at: raw.scraped_at.unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(platform: &str, price: f64) -> RawListing {
        RawListing {
            platform: platform.to_owned(),
            price,
            title: Some("Sterling Bow Charm".to_owned()),
            condition: Some("Pre-owned".to_owned()),
            url: None,
            image_url: None,
            seller: None,
            scraped_at: None,
        }
    }

    #[test]
    fn ingest_normalizes_platform_casing() {
        let listings = ingest_listings(vec![raw("ebay", 40.0), raw("Ebay", 50.0)]);
        assert_eq!(listings.len(), 2);
        assert!(listings.iter().all(|l| l.platform == Platform::Ebay));
    }

    #[test]
    fn ingest_drops_unrecognized_platform() {
        let listings = ingest_listings(vec![raw("mercari", 10.0), raw("etsy", 12.0)]);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].platform, Platform::Etsy);
    }

    #[test]
    fn ingest_drops_nan_and_infinite_prices() {
        let listings = ingest_listings(vec![
            raw("ebay", f64::NAN),
            raw("ebay", f64::INFINITY),
            raw("ebay", 25.0),
        ]);
        assert_eq!(listings.len(), 1);
    }

    #[test]
    fn ingest_drops_negative_prices() {
        let listings = ingest_listings(vec![raw("poshmark", -3.5)]);
        assert!(listings.is_empty());
    }

    #[test]
    fn ingest_rounds_price_to_cents() {
        let listings = ingest_listings(vec![raw("etsy", 19.999)]);
        assert_eq!(listings[0].price, "20.00".parse().expect("decimal"));
    }

    #[test]
    fn ingest_carries_descriptive_fields_opaquely() {
        let listings = ingest_listings(vec![raw("ebay", 5.0)]);
        assert_eq!(listings[0].title.as_deref(), Some("Sterling Bow Charm"));
        assert_eq!(listings[0].condition.as_deref(), Some("Pre-owned"));
    }
}
