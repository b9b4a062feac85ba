//! Offline and live price-comparison reports.

use std::path::Path;

use anyhow::Context;
use rust_decimal::Decimal;
use serde::Serialize;

use charmtrack_core::pricing::{
    best_deal, compute_deltas, rollup, summarize, BestDealScope, PriceBoard, SummaryKey,
};
use charmtrack_core::Listing;
use charmtrack_source::{ingest_listings, RawListing, ScrapeClient};

#[derive(Debug, Serialize)]
struct SummaryRow {
    platform: &'static str,
    average: Decimal,
    min: Decimal,
    max: Decimal,
    count: u32,
}

#[derive(Debug, Serialize)]
struct DeltaRow {
    platform: &'static str,
    amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    percent: Option<Decimal>,
    is_savings: bool,
}

#[derive(Debug, Serialize)]
struct BestDealRow {
    platform: &'static str,
    average: Decimal,
    count: u32,
}

#[derive(Debug, Serialize)]
struct RollupRow {
    lowest: Decimal,
    highest: Decimal,
    range: Decimal,
    total_listings: u32,
}

#[derive(Debug, Serialize)]
struct ComparisonReport {
    summaries: Vec<SummaryRow>,
    deltas: Vec<DeltaRow>,
    best_deal: Option<BestDealRow>,
    rollup: Option<RollupRow>,
}

fn build_report(board: &PriceBoard, scope: BestDealScope) -> ComparisonReport {
    let deltas = compute_deltas(board);

    let summaries = board
        .iter()
        .map(|(key, summary)| {
            let rounded = summary.rounded();
            SummaryRow {
                platform: key.display_name(),
                average: rounded.average,
                min: rounded.min,
                max: rounded.max,
                count: rounded.count,
            }
        })
        .collect();

    let delta_rows = board
        .iter()
        .filter_map(|(key, _)| match key {
            SummaryKey::Marketplace(platform) => deltas.get(platform).map(|d| DeltaRow {
                platform: platform.display_name(),
                amount: d.amount.round_dp(2),
                percent: d.percent,
                is_savings: d.is_savings,
            }),
            SummaryKey::Reference => None,
        })
        .collect();

    let best = best_deal(board, scope).map(|(key, summary)| BestDealRow {
        platform: key.display_name(),
        average: summary.average.round_dp(2),
        count: summary.count,
    });

    let rollup_row = rollup(board).map(|r| RollupRow {
        lowest: r.lowest.round_dp(2),
        highest: r.highest.round_dp(2),
        range: r.range.round_dp(2),
        total_listings: r.total_listings,
    });

    ComparisonReport {
        summaries,
        deltas: delta_rows,
        best_deal: best,
        rollup: rollup_row,
    }
}

fn report_listings(
    listings: &[Listing],
    reference: Option<Decimal>,
    include_reference: bool,
) -> anyhow::Result<()> {
    let board = summarize(listings, reference);
    let scope = if include_reference {
        BestDealScope::IncludeReference
    } else {
        BestDealScope::MarketplacesOnly
    };
    let report = build_report(&board, scope);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Compare prices from a listings JSON snapshot on disk.
pub fn run_from_file(
    path: &Path,
    reference: Option<Decimal>,
    include_reference: bool,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read listings file {}", path.display()))?;
    let raw: Vec<RawListing> =
        serde_json::from_str(&content).context("listings file is not a JSON listing array")?;

    let total = raw.len();
    let listings = ingest_listings(raw);
    if listings.len() < total {
        tracing::info!(
            dropped = total - listings.len(),
            "some listings were rejected at ingestion"
        );
    }

    report_listings(&listings, reference, include_reference)
}

/// Fetch live listings from the scrape service and compare.
pub async fn run_live(
    query: &str,
    base_url: &str,
    reference: Option<Decimal>,
) -> anyhow::Result<()> {
    let client = ScrapeClient::new(30, "charmtrack-cli/0.1", 3, 5)?;
    let raw = client
        .search_listings(base_url, query)
        .await
        .with_context(|| format!("listing search failed for \"{query}\""))?;

    let listings = ingest_listings(raw);
    report_listings(&listings, reference, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use charmtrack_core::Platform;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    #[test]
    fn report_orders_summaries_and_names_best_deal() {
        let listings = vec![
            Listing::new(Platform::Ebay, dec("50")),
            Listing::new(Platform::Etsy, dec("45")),
            Listing::new(Platform::Poshmark, dec("45")),
        ];
        let board = summarize(&listings, Some(dec("60")));
        let report = build_report(&board, BestDealScope::MarketplacesOnly);

        let platforms: Vec<_> = report.summaries.iter().map(|s| s.platform).collect();
        assert_eq!(platforms, vec!["eBay", "Etsy", "Poshmark", "Reference"]);

        let best = report.best_deal.expect("best deal");
        assert_eq!(best.platform, "Etsy");
        assert_eq!(best.average, dec("45"));
    }

    #[test]
    fn report_empty_board_has_no_best_deal_or_rollup() {
        let board = summarize(&[], None);
        let report = build_report(&board, BestDealScope::MarketplacesOnly);
        assert!(report.summaries.is_empty());
        assert!(report.best_deal.is_none());
        assert!(report.rollup.is_none());
    }

    #[test]
    fn report_includes_reference_when_scoped_in() {
        let listings = vec![Listing::new(Platform::Ebay, dec("70"))];
        let board = summarize(&listings, Some(dec("40")));
        let report = build_report(&board, BestDealScope::IncludeReference);
        assert_eq!(report.best_deal.expect("best deal").platform, "Reference");
    }
}
