use axum::{
    extract::{Path, State},
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use charmtrack_core::{CharmStatus, Material};

use crate::middleware::RequestId;

use super::{map_store_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct WatchedCharm {
    id: Uuid,
    name: String,
    material: Material,
    status: CharmStatus,
    avg_price: Option<Decimal>,
    price_change_7d: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct WatchlistData {
    ids: Vec<Uuid>,
    /// Resolved summaries for watched charms that still exist in the
    /// catalog; stale ids are kept in `ids` but produce no summary.
    charms: Vec<WatchedCharm>,
}

#[derive(Debug, Serialize)]
pub(super) struct WatchToggleData {
    id: Uuid,
    watched: bool,
    changed: bool,
}

pub(super) async fn list_watchlist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<WatchlistData>>, ApiError> {
    let ids = state
        .watchlist
        .ids()
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    let charms = ids
        .iter()
        .filter_map(|id| state.store.get(*id))
        .map(|charm| WatchedCharm {
            id: charm.id,
            name: charm.name,
            material: charm.material,
            status: charm.status,
            avg_price: charm.avg_price.map(|p| p.round_dp(2)),
            price_change_7d: charm.price_changes.d7,
        })
        .collect();

    Ok(Json(ApiResponse {
        data: WatchlistData { ids, charms },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn watch_charm(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<WatchToggleData>>, ApiError> {
    if state.store.get(id).is_none() {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("no charm {id}"),
        ));
    }

    let changed = state
        .watchlist
        .add(id)
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: WatchToggleData {
            id,
            watched: true,
            changed,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn unwatch_charm(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<WatchToggleData>>, ApiError> {
    let changed = state
        .watchlist
        .remove(id)
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: WatchToggleData {
            id,
            watched: false,
            changed,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
