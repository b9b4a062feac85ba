//! Price-history analytics: trend windows, history recording rules, and
//! the popularity score derived from listing volume.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Append a new history point only when the last one is older than this,
/// unless the price moved materially.
const MIN_RECORD_GAP_HOURS: i64 = 12;

/// Price movement (absolute dollars) that always warrants a new point.
const MATERIAL_MOVE: &str = "1.0";

/// History retention window.
const RETENTION_DAYS: i64 = 180;

/// One aggregated price observation in a charm's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: DateTime<Utc>,
    pub price: Decimal,
    pub source: String,
    pub listing_count: u32,
}

/// Percent change of the current price against 7/30/90-day baselines,
/// rounded to one decimal. Zero when no baseline exists for a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceChanges {
    pub d7: Decimal,
    pub d30: Decimal,
    pub d90: Decimal,
}

/// Computes trend windows from a chronologically ordered history.
///
/// For each window the baseline is the most recent point at least N days
/// old; a zero or missing baseline leaves that window at zero rather than
/// producing a division artifact.
#[must_use]
pub fn price_changes(
    history: &[PricePoint],
    current_price: Decimal,
    now: DateTime<Utc>,
) -> PriceChanges {
    let mut baseline_7d = None;
    let mut baseline_30d = None;
    let mut baseline_90d = None;

    for point in history.iter().rev() {
        let days_ago = (now - point.date).num_days();
        if days_ago >= 7 && baseline_7d.is_none() {
            baseline_7d = Some(point.price);
        }
        if days_ago >= 30 && baseline_30d.is_none() {
            baseline_30d = Some(point.price);
        }
        if days_ago >= 90 && baseline_90d.is_none() {
            baseline_90d = Some(point.price);
        }
    }

    PriceChanges {
        d7: percent_change(current_price, baseline_7d),
        d30: percent_change(current_price, baseline_30d),
        d90: percent_change(current_price, baseline_90d),
    }
}

fn percent_change(current: Decimal, baseline: Option<Decimal>) -> Decimal {
    match baseline {
        Some(base) if base > Decimal::ZERO => {
            ((current - base) / base * Decimal::ONE_HUNDRED).round_dp(1)
        }
        _ => Decimal::ZERO,
    }
}

/// Appends `point` to `history` under the recording rules, then prunes
/// points older than the retention window.
///
/// A new point is recorded when the history is empty, when the last point
/// is at least 12 hours old, or when the price moved by at least $1.00.
/// Returns whether the point was recorded.
pub fn record_price(history: &mut Vec<PricePoint>, point: PricePoint, now: DateTime<Utc>) -> bool {
    let material: Decimal = MATERIAL_MOVE.parse().unwrap_or(Decimal::ONE);

    let should_record = match history.last() {
        None => true,
        Some(last) => {
            let age = now - last.date;
            age >= Duration::hours(MIN_RECORD_GAP_HOURS)
                || (point.price - last.price).abs() >= material
        }
    };

    if !should_record {
        return false;
    }

    history.push(point);
    let cutoff = now - Duration::days(RETENTION_DAYS);
    history.retain(|p| p.date >= cutoff);
    true
}

/// Popularity on a 0–100 scale from listing volume, saturating at 30
/// listings. Never drops below the previous score, so a thin scrape does
/// not erase accumulated interest.
#[must_use]
pub fn popularity_score(listing_count: u32, previous: u8) -> u8 {
    let scaled = listing_count.saturating_mul(100) / 30;
    let capped = u8::try_from(scaled.min(100)).unwrap_or(100);
    capped.max(previous)
}
