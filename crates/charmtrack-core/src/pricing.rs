//! Marketplace price aggregation.
//!
//! Transforms a flat list of listings (plus an optional official reference
//! price) into per-marketplace statistics, deltas against the reference,
//! and a best-deal ranking. Everything here is a pure function of its
//! input: derived values are recomputed from scratch on every call and
//! nothing is mutated in place.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::listing::Listing;
use crate::platform::Platform;

/// Key for one row of a [`PriceBoard`]: either a resale marketplace or the
/// synthetic entry for the official reference price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKey {
    Marketplace(Platform),
    Reference,
}

impl SummaryKey {
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            SummaryKey::Marketplace(platform) => platform.display_name(),
            SummaryKey::Reference => "Reference",
        }
    }
}

impl std::fmt::Display for SummaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl Serialize for SummaryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_name())
    }
}

/// Aggregated price statistics for one marketplace (or the reference).
///
/// Exists only for groups with at least one contributing listing; a
/// marketplace with zero listings is absent from the board, never zeroed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketplaceSummary {
    /// Arithmetic mean of the group's listing prices, at full precision.
    pub average: Decimal,
    pub min: Decimal,
    pub max: Decimal,
    pub count: u32,
}

impl MarketplaceSummary {
    /// Copy with `average`/`min`/`max` rounded to two decimals, for output
    /// boundaries. Internal computation never rounds.
    #[must_use]
    pub fn rounded(&self) -> MarketplaceSummary {
        MarketplaceSummary {
            average: self.average.round_dp(2),
            min: self.min.round_dp(2),
            max: self.max.round_dp(2),
            count: self.count,
        }
    }
}

/// Ordered set of marketplace summaries for one charm.
///
/// Entries appear in first-encounter order of the input listing slice,
/// with the reference entry (if any) last. That order is the deterministic
/// tie-break order for [`best_deal`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct PriceBoard {
    entries: Vec<(SummaryKey, MarketplaceSummary)>,
}

impl PriceBoard {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (SummaryKey, MarketplaceSummary)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn get(&self, key: SummaryKey) -> Option<&MarketplaceSummary> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, summary)| summary)
    }

    /// The synthetic reference-price entry, if a reference price was given.
    #[must_use]
    pub fn reference(&self) -> Option<&MarketplaceSummary> {
        self.get(SummaryKey::Reference)
    }

    /// Total listings contributing to the board, the reference pseudo-listing
    /// included.
    #[must_use]
    pub fn total_listings(&self) -> u32 {
        self.entries.iter().map(|(_, s)| s.count).sum()
    }
}

impl<'a> IntoIterator for &'a PriceBoard {
    type Item = &'a (SummaryKey, MarketplaceSummary);
    type IntoIter = std::slice::Iter<'a, (SummaryKey, MarketplaceSummary)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Signed difference between a marketplace's average and the reference price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceDelta {
    /// `marketplace average - reference price`, full precision.
    pub amount: Decimal,
    /// `amount / reference * 100`, rounded to one decimal. Omitted when the
    /// reference price is exactly zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<Decimal>,
    /// Strictly cheaper than the reference. A marketplace priced exactly at
    /// the reference is neither savings nor markup.
    pub is_savings: bool,
}

/// Whether [`best_deal`] may pick the reference entry.
///
/// The official price is not a purchasable marketplace offer, so callers
/// driving "best deal" messaging typically want [`MarketplacesOnly`];
/// chart-style views that rank every bar may include the reference.
///
/// [`MarketplacesOnly`]: BestDealScope::MarketplacesOnly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestDealScope {
    MarketplacesOnly,
    IncludeReference,
}

/// Spread statistics over the board's summary averages (not raw listings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceRollup {
    pub lowest: Decimal,
    pub highest: Decimal,
    pub range: Decimal,
    pub total_listings: u32,
}

struct GroupStats {
    sum: Decimal,
    min: Decimal,
    max: Decimal,
    count: u32,
}

/// Groups listings by platform and computes per-marketplace statistics.
///
/// Listings with negative prices are skipped with a diagnostic rather than
/// poisoning the averages; the ingestion boundary is expected to have
/// filtered them already. If `reference_price` is present, a one-element
/// `Reference` entry is appended last. Empty input with no reference yields
/// an empty board, which callers must read as "insufficient data", not a
/// price of zero.
#[must_use]
pub fn summarize(listings: &[Listing], reference_price: Option<Decimal>) -> PriceBoard {
    let mut groups: Vec<(Platform, GroupStats)> = Vec::new();

    for listing in listings {
        if listing.price < Decimal::ZERO {
            tracing::warn!(
                platform = %listing.platform,
                price = %listing.price,
                "skipping listing with negative price"
            );
            continue;
        }

        match groups.iter_mut().find(|(p, _)| *p == listing.platform) {
            Some((_, stats)) => {
                stats.sum += listing.price;
                stats.count += 1;
                if listing.price < stats.min {
                    stats.min = listing.price;
                }
                if listing.price > stats.max {
                    stats.max = listing.price;
                }
            }
            None => groups.push((
                listing.platform,
                GroupStats {
                    sum: listing.price,
                    min: listing.price,
                    max: listing.price,
                    count: 1,
                },
            )),
        }
    }

    let mut entries: Vec<(SummaryKey, MarketplaceSummary)> = groups
        .into_iter()
        .map(|(platform, stats)| {
            (
                SummaryKey::Marketplace(platform),
                MarketplaceSummary {
                    average: stats.sum / Decimal::from(stats.count),
                    min: stats.min,
                    max: stats.max,
                    count: stats.count,
                },
            )
        })
        .collect();

    if let Some(reference) = reference_price {
        entries.push((
            SummaryKey::Reference,
            MarketplaceSummary {
                average: reference,
                min: reference,
                max: reference,
                count: 1,
            },
        ));
    }

    PriceBoard { entries }
}

/// Computes signed deltas of every marketplace average against the
/// reference entry.
///
/// Returns an empty map when the board has no reference entry: deltas are
/// meaningless without a baseline, and absence is not an error. `percent`
/// is omitted when the reference average is exactly zero.
#[must_use]
pub fn compute_deltas(board: &PriceBoard) -> BTreeMap<Platform, PriceDelta> {
    let Some(reference) = board.reference() else {
        return BTreeMap::new();
    };
    let reference_avg = reference.average;

    board
        .iter()
        .filter_map(|(key, summary)| match key {
            SummaryKey::Marketplace(platform) => {
                let amount = summary.average - reference_avg;
                let percent = if reference_avg.is_zero() {
                    None
                } else {
                    Some((amount / reference_avg * Decimal::ONE_HUNDRED).round_dp(1))
                };
                Some((
                    *platform,
                    PriceDelta {
                        amount,
                        percent,
                        is_savings: amount < Decimal::ZERO,
                    },
                ))
            }
            SummaryKey::Reference => None,
        })
        .collect()
}

/// Selects the entry with the strictly lowest average.
///
/// Ties go to the first-encountered entry in board order. Returns `None`
/// for an empty board, or when `scope` excludes the reference and the
/// board holds nothing else.
#[must_use]
pub fn best_deal(
    board: &PriceBoard,
    scope: BestDealScope,
) -> Option<(SummaryKey, &MarketplaceSummary)> {
    let mut best: Option<(SummaryKey, &MarketplaceSummary)> = None;

    for (key, summary) in board {
        if *key == SummaryKey::Reference && scope == BestDealScope::MarketplacesOnly {
            continue;
        }
        match best {
            Some((_, current)) if summary.average >= current.average => {}
            _ => best = Some((*key, summary)),
        }
    }

    best
}

/// Spread over the board's summary averages.
///
/// `lowest`/`highest` range over averages, not raw listing prices; with a
/// single summary the range degenerates to zero. `None` for an empty board.
#[must_use]
pub fn rollup(board: &PriceBoard) -> Option<PriceRollup> {
    let mut averages = board.iter().map(|(_, s)| s.average);
    let first = averages.next()?;

    let (lowest, highest) = averages.fold((first, first), |(lo, hi), avg| {
        (if avg < lo { avg } else { lo }, if avg > hi { avg } else { hi })
    });

    Some(PriceRollup {
        lowest,
        highest,
        range: highest - lowest,
        total_listings: board.total_listings(),
    })
}
