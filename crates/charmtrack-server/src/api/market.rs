use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use charmtrack_core::{Charm, CharmStatus, Material};
use charmtrack_store::{CharmFilter, CharmSort};

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, ResponseMeta};

const TRENDING_COUNT: usize = 6;
const MOVERS_COUNT: usize = 5;

#[derive(Debug, Serialize)]
pub(super) struct TrendingItem {
    id: Uuid,
    name: String,
    avg_price: Option<Decimal>,
    price_change: Decimal,
    material: Material,
    status: CharmStatus,
    image: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct MoverItem {
    id: Uuid,
    name: String,
    change: Decimal,
    avg_price: Option<Decimal>,
    image: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct RecentItem {
    id: Uuid,
    name: String,
    avg_price: Option<Decimal>,
    image: Option<String>,
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct MarketOverview {
    average_price: Decimal,
    total_charms: usize,
    active_charms: usize,
    retired_charms: usize,
    top_gainers: Vec<MoverItem>,
    top_losers: Vec<MoverItem>,
    recently_updated: Vec<RecentItem>,
}

fn first_image(charm: &Charm) -> Option<String> {
    charm.images.first().cloned()
}

fn mover(charm: &Charm) -> MoverItem {
    MoverItem {
        id: charm.id,
        name: charm.name.clone(),
        change: charm.price_changes.d7,
        avg_price: charm.avg_price.map(|p| p.round_dp(2)),
        image: first_image(charm),
    }
}

/// Top charms by popularity, ties broken by 7-day price movement.
pub(super) async fn trending(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<TrendingItem>>> {
    let charms = state.store.list(&CharmFilter {
        sort: CharmSort::Popularity,
        limit: Some(TRENDING_COUNT),
        ..CharmFilter::default()
    });

    let data = charms
        .into_iter()
        .map(|charm| TrendingItem {
            id: charm.id,
            name: charm.name.clone(),
            avg_price: charm.avg_price.map(|p| p.round_dp(2)),
            price_change: charm.price_changes.d7,
            material: charm.material,
            status: charm.status,
            image: first_image(&charm),
        })
        .collect();

    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}

/// Whole-market statistics over the current catalog snapshot.
pub(super) async fn overview(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<MarketOverview>> {
    let charms = state.store.list(&CharmFilter::default());

    let total_charms = charms.len();
    let active_charms = charms
        .iter()
        .filter(|c| c.status == CharmStatus::Active)
        .count();
    let retired_charms = charms
        .iter()
        .filter(|c| c.status == CharmStatus::Retired)
        .count();

    // Mean over charms that have pricing data; absence of data never reads
    // as a zero price.
    let priced: Vec<Decimal> = charms.iter().filter_map(|c| c.avg_price).collect();
    let average_price = if priced.is_empty() {
        Decimal::ZERO
    } else {
        let sum: Decimal = priced.iter().copied().sum();
        (sum / Decimal::from(priced.len() as u64)).round_dp(2)
    };

    let mut by_change = charms.clone();
    by_change.sort_by(|a, b| b.price_changes.d7.cmp(&a.price_changes.d7));
    let top_gainers = by_change.iter().take(MOVERS_COUNT).map(mover).collect();
    let top_losers = by_change
        .iter()
        .rev()
        .take(MOVERS_COUNT)
        .map(mover)
        .collect();

    let mut by_updated = charms;
    by_updated.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
    let recently_updated = by_updated
        .iter()
        .take(MOVERS_COUNT)
        .map(|charm| RecentItem {
            id: charm.id,
            name: charm.name.clone(),
            avg_price: charm.avg_price.map(|p| p.round_dp(2)),
            image: first_image(charm),
            last_updated: charm.last_updated,
        })
        .collect();

    Json(ApiResponse {
        data: MarketOverview {
            average_price,
            total_charms,
            active_charms,
            retired_charms,
            top_gainers,
            top_losers,
            recently_updated,
        },
        meta: ResponseMeta::new(req_id.0),
    })
}
