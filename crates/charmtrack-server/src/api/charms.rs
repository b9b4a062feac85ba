use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use charmtrack_core::history::PricePoint;
use charmtrack_core::pricing::{
    best_deal, compute_deltas, rollup, summarize, BestDealScope, SummaryKey,
};
use charmtrack_core::{Charm, CharmStatus, Listing, Material};
use charmtrack_source::ingest_listings;
use charmtrack_store::{CharmFilter, CharmSort};

use crate::middleware::RequestId;

use super::{map_store_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CharmListQuery {
    pub search: Option<String>,
    pub material: Option<Material>,
    pub status: Option<CharmStatus>,
    pub sort: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct CharmListItem {
    id: Uuid,
    name: String,
    material: Material,
    status: CharmStatus,
    avg_price: Option<Decimal>,
    price_change_7d: Decimal,
    popularity: u8,
    images: Vec<String>,
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct CharmDetail {
    id: Uuid,
    name: String,
    description: String,
    material: Material,
    status: CharmStatus,
    reference_price: Option<Decimal>,
    reference_url: Option<String>,
    avg_price: Option<Decimal>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
    price_change_7d: Decimal,
    price_change_30d: Decimal,
    price_change_90d: Decimal,
    popularity: u8,
    images: Vec<String>,
    listings: Vec<Listing>,
    price_history: Vec<PricePoint>,
    last_updated: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateCharmRequest {
    name: String,
    description: String,
    material: Material,
    status: CharmStatus,
    reference_price: Option<Decimal>,
    reference_url: Option<String>,
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SummaryItem {
    platform: &'static str,
    average: Decimal,
    min: Decimal,
    max: Decimal,
    count: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct DeltaItem {
    platform: &'static str,
    amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    percent: Option<Decimal>,
    is_savings: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct BestDealItem {
    platform: &'static str,
    average: Decimal,
    count: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct RollupItem {
    lowest: Decimal,
    highest: Decimal,
    range: Decimal,
    total_listings: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct ComparisonData {
    charm_id: Uuid,
    name: String,
    summaries: Vec<SummaryItem>,
    deltas: Vec<DeltaItem>,
    best_deal: Option<BestDealItem>,
    rollup: Option<RollupItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshData {
    listing_count: usize,
    charm: CharmDetail,
}

fn list_item(charm: Charm) -> CharmListItem {
    CharmListItem {
        id: charm.id,
        name: charm.name,
        material: charm.material,
        status: charm.status,
        avg_price: charm.avg_price.map(|p| p.round_dp(2)),
        price_change_7d: charm.price_changes.d7,
        popularity: charm.popularity,
        images: charm.images,
        last_updated: charm.last_updated,
    }
}

fn detail(charm: Charm) -> CharmDetail {
    CharmDetail {
        id: charm.id,
        name: charm.name,
        description: charm.description,
        material: charm.material,
        status: charm.status,
        reference_price: charm.reference_price,
        reference_url: charm.reference_url,
        avg_price: charm.avg_price.map(|p| p.round_dp(2)),
        min_price: charm.min_price.map(|p| p.round_dp(2)),
        max_price: charm.max_price.map(|p| p.round_dp(2)),
        price_change_7d: charm.price_changes.d7,
        price_change_30d: charm.price_changes.d30,
        price_change_90d: charm.price_changes.d90,
        popularity: charm.popularity,
        images: charm.images,
        listings: charm.listings,
        price_history: charm.price_history,
        last_updated: charm.last_updated,
        created_at: charm.created_at,
    }
}

fn parse_sort(raw: Option<&str>) -> CharmSort {
    match raw {
        Some("name") => CharmSort::Name,
        Some("price") => CharmSort::AvgPrice,
        Some("change") => CharmSort::Change7d,
        Some("updated") => CharmSort::LastUpdated,
        _ => CharmSort::Popularity,
    }
}

pub(super) async fn list_charms(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CharmListQuery>,
) -> Json<ApiResponse<Vec<CharmListItem>>> {
    let filter = CharmFilter {
        search: query.search,
        material: query.material,
        status: query.status,
        sort: parse_sort(query.sort.as_deref()),
        limit: Some(normalize_limit(query.limit)),
    };

    let data = state
        .store
        .list(&filter)
        .into_iter()
        .map(list_item)
        .collect();

    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn get_charm(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CharmDetail>>, ApiError> {
    let charm = state
        .store
        .get(id)
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", format!("no charm {id}")))?;

    Ok(Json(ApiResponse {
        data: detail(charm),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn create_charm(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(request): Json<CreateCharmRequest>,
) -> Result<Json<ApiResponse<CharmDetail>>, ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "charm name must be non-empty",
        ));
    }
    if let Some(price) = request.reference_price {
        if price < Decimal::ZERO {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "reference price must be non-negative",
            ));
        }
    }

    let mut charm = Charm::new(
        request.name,
        request.description,
        request.material,
        request.status,
        request.reference_price,
    );
    charm.reference_url = request.reference_url;
    charm.images = request.images;

    let id = state.store.insert(charm);
    let created = state
        .store
        .get(id)
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "internal_error", "charm vanished"))?;

    tracing::info!(charm = %created.name, %id, "created charm");
    Ok(Json(ApiResponse {
        data: detail(created),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Marketplace price comparison for one charm.
///
/// An empty listing set is not an error: summaries and deltas come back
/// empty with a null best deal, and the client branches on presence.
pub(super) async fn get_comparison(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ComparisonData>>, ApiError> {
    let charm = state
        .store
        .get(id)
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", format!("no charm {id}")))?;

    let board = summarize(&charm.listings, charm.reference_price);
    let deltas = compute_deltas(&board);

    let summaries = board
        .iter()
        .map(|(key, summary)| {
            let rounded = summary.rounded();
            SummaryItem {
                platform: key.display_name(),
                average: rounded.average,
                min: rounded.min,
                max: rounded.max,
                count: rounded.count,
            }
        })
        .collect();

    // Emit deltas in board order so the client renders rows consistently.
    let deltas = board
        .iter()
        .filter_map(|(key, _)| match key {
            SummaryKey::Marketplace(platform) => {
                deltas.get(platform).map(|delta| DeltaItem {
                    platform: platform.display_name(),
                    amount: delta.amount.round_dp(2),
                    percent: delta.percent,
                    is_savings: delta.is_savings,
                })
            }
            SummaryKey::Reference => None,
        })
        .collect();

    // The official price is not a purchasable offer, so it never wins
    // the best-deal callout.
    let best = best_deal(&board, BestDealScope::MarketplacesOnly).map(|(key, summary)| {
        BestDealItem {
            platform: key.display_name(),
            average: summary.average.round_dp(2),
            count: summary.count,
        }
    });

    let rollup = rollup(&board).map(|r| RollupItem {
        lowest: r.lowest.round_dp(2),
        highest: r.highest.round_dp(2),
        range: r.range.round_dp(2),
        total_listings: r.total_listings,
    });

    Ok(Json(ApiResponse {
        data: ComparisonData {
            charm_id: charm.id,
            name: charm.name,
            summaries,
            deltas,
            best_deal: best,
            rollup,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// One-shot fetch from the scrape service followed by re-aggregation.
pub(super) async fn refresh_charm(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RefreshData>>, ApiError> {
    let charm = state
        .store
        .get(id)
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", format!("no charm {id}")))?;

    let raw = state
        .source
        .search_listings(&state.config.source_base_url, &charm.name)
        .await
        .map_err(|e| {
            tracing::error!(charm = %charm.name, error = %e, "live price fetch failed");
            ApiError::new(
                req_id.0.clone(),
                "upstream_unavailable",
                "scrape service unavailable",
            )
        })?;

    let listings = ingest_listings(raw);
    let listing_count = listings.len();

    state
        .store
        .apply_refresh(id, listings, Utc::now())
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    let refreshed = state
        .store
        .get(id)
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "internal_error", "charm vanished"))?;

    Ok(Json(ApiResponse {
        data: RefreshData {
            listing_count,
            charm: detail(refreshed),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
