use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::{PriceChanges, PricePoint};
use crate::listing::Listing;

/// Charm material. Individual charms are silver or gold only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Material {
    Silver,
    Gold,
}

impl std::fmt::Display for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Material::Silver => write!(f, "Silver"),
            Material::Gold => write!(f, "Gold"),
        }
    }
}

/// Whether the manufacturer still sells the charm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharmStatus {
    Active,
    Retired,
}

impl std::fmt::Display for CharmStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CharmStatus::Active => write!(f, "Active"),
            CharmStatus::Retired => write!(f, "Retired"),
        }
    }
}

/// A tracked charm: catalog identity plus the derived pricing state
/// recomputed from the current listing set on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charm {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub material: Material,
    pub status: CharmStatus,
    /// Official manufacturer list price, when known. Used as the baseline
    /// for marketplace deltas; absent for discontinued items with no list
    /// price.
    pub reference_price: Option<Decimal>,
    pub reference_url: Option<String>,
    pub avg_price: Option<Decimal>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub price_history: Vec<PricePoint>,
    pub price_changes: PriceChanges,
    /// 0–100 interest score derived from listing volume. New charms start
    /// at [`BASELINE_POPULARITY`] and refreshes only ever raise the score.
    pub popularity: u8,
    pub images: Vec<String>,
    pub listings: Vec<Listing>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Starting interest score for a freshly tracked charm. A charm with no
/// scrape data yet reads as middling interest, not as ignored; a thin
/// first scrape cannot push it lower because the score never regresses.
pub const BASELINE_POPULARITY: u8 = 50;

impl Charm {
    /// A fresh charm with no pricing data yet.
    #[must_use]
    pub fn new(
        name: String,
        description: String,
        material: Material,
        status: CharmStatus,
        reference_price: Option<Decimal>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            material,
            status,
            reference_price,
            reference_url: None,
            avg_price: None,
            min_price: None,
            max_price: None,
            price_history: Vec::new(),
            price_changes: PriceChanges::default(),
            popularity: BASELINE_POPULARITY,
            images: Vec::new(),
            listings: Vec::new(),
            last_updated: now,
            created_at: now,
        }
    }

    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.status == CharmStatus::Retired
    }

    #[must_use]
    pub fn listing_count(&self) -> usize {
        self.listings.len()
    }
}
