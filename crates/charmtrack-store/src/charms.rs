//! In-memory charm catalog.
//!
//! `apply_refresh` is the single write path for pricing state: it replaces
//! the listing set and recomputes every derived field from scratch, so a
//! charm's pricing is always a pure function of its current listings.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use charmtrack_core::history::{popularity_score, price_changes, record_price, PricePoint};
use charmtrack_core::{Charm, CharmStatus, Listing, Material};

use crate::error::StoreError;

/// Keep at most this many listings per charm; upstream search results are
/// relevance-ordered so the head of the list is the useful part.
const MAX_LISTINGS: usize = 20;

/// How charm list results are ordered. All orders are descending except
/// `Name`, matching the browse views this feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharmSort {
    Name,
    AvgPrice,
    #[default]
    Popularity,
    Change7d,
    LastUpdated,
}

/// Filter and ordering for [`CharmStore::list`].
#[derive(Debug, Clone, Default)]
pub struct CharmFilter {
    /// Case-insensitive substring match on the charm name.
    pub search: Option<String>,
    pub material: Option<Material>,
    pub status: Option<CharmStatus>,
    pub sort: CharmSort,
    pub limit: Option<usize>,
}

/// Thread-safe in-memory charm store.
#[derive(Debug, Default)]
pub struct CharmStore {
    charms: RwLock<HashMap<Uuid, Charm>>,
}

impl CharmStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from materialized catalog entries.
    pub fn seed(&self, charms: Vec<Charm>) {
        let mut guard = self.charms.write().expect("charm store lock poisoned");
        for charm in charms {
            guard.insert(charm.id, charm);
        }
    }

    pub fn insert(&self, charm: Charm) -> Uuid {
        let id = charm.id;
        self.charms
            .write()
            .expect("charm store lock poisoned")
            .insert(id, charm);
        id
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Charm> {
        self.charms
            .read()
            .expect("charm store lock poisoned")
            .get(&id)
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.charms
            .read()
            .expect("charm store lock poisoned")
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All charm ids, for refresh sweeps.
    #[must_use]
    pub fn ids(&self) -> Vec<Uuid> {
        self.charms
            .read()
            .expect("charm store lock poisoned")
            .keys()
            .copied()
            .collect()
    }

    /// Filtered, sorted snapshot of the catalog.
    #[must_use]
    pub fn list(&self, filter: &CharmFilter) -> Vec<Charm> {
        let guard = self.charms.read().expect("charm store lock poisoned");

        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut charms: Vec<Charm> = guard
            .values()
            .filter(|c| {
                needle
                    .as_ref()
                    .is_none_or(|n| c.name.to_lowercase().contains(n))
            })
            .filter(|c| filter.material.is_none_or(|m| c.material == m))
            .filter(|c| filter.status.is_none_or(|s| c.status == s))
            .cloned()
            .collect();
        drop(guard);

        match filter.sort {
            CharmSort::Name => charms.sort_by(|a, b| a.name.cmp(&b.name)),
            CharmSort::AvgPrice => charms.sort_by(|a, b| {
                b.avg_price
                    .unwrap_or(Decimal::ZERO)
                    .cmp(&a.avg_price.unwrap_or(Decimal::ZERO))
            }),
            CharmSort::Popularity => charms.sort_by(|a, b| {
                b.popularity
                    .cmp(&a.popularity)
                    .then(b.price_changes.d7.cmp(&a.price_changes.d7))
            }),
            CharmSort::Change7d => {
                charms.sort_by(|a, b| b.price_changes.d7.cmp(&a.price_changes.d7));
            }
            CharmSort::LastUpdated => charms.sort_by(|a, b| b.last_updated.cmp(&a.last_updated)),
        }

        if let Some(limit) = filter.limit {
            charms.truncate(limit);
        }
        charms
    }

    /// Replaces a charm's listings and recomputes all derived pricing state.
    ///
    /// Listings are expected to have passed the ingestion boundary already
    /// (validated platform and price). With an empty listing set the derived
    /// prices are cleared rather than zeroed; absence signals "no data".
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CharmNotFound`] for an unknown id.
    pub fn apply_refresh(
        &self,
        id: Uuid,
        mut listings: Vec<Listing>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut guard = self.charms.write().expect("charm store lock poisoned");
        let charm = guard.get_mut(&id).ok_or(StoreError::CharmNotFound(id))?;

        listings.truncate(MAX_LISTINGS);
        let listing_count = listings.len();

        if listings.is_empty() {
            charm.avg_price = None;
            charm.min_price = None;
            charm.max_price = None;
        } else {
            let mut sum = Decimal::ZERO;
            let mut min = listings[0].price;
            let mut max = listings[0].price;
            for listing in &listings {
                sum += listing.price;
                if listing.price < min {
                    min = listing.price;
                }
                if listing.price > max {
                    max = listing.price;
                }
            }
            let avg = sum / Decimal::from(listing_count as u64);

            charm.avg_price = Some(avg);
            charm.min_price = Some(min);
            charm.max_price = Some(max);

            let recorded = record_price(
                &mut charm.price_history,
                PricePoint {
                    date: now,
                    price: avg.round_dp(2),
                    source: "aggregated".to_owned(),
                    listing_count: listing_count as u32,
                },
                now,
            );
            if recorded {
                charm.price_changes = price_changes(&charm.price_history, avg, now);
            }

            charm.popularity = popularity_score(listing_count as u32, charm.popularity);
        }

        charm.listings = listings;
        charm.last_updated = now;

        tracing::debug!(charm = %charm.name, listing_count, "refreshed charm pricing");
        Ok(())
    }
}
