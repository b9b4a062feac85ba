mod charms;
mod market;
mod watchlist;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use charmtrack_core::AppConfig;
use charmtrack_source::ScrapeClient;
use charmtrack_store::{CharmStore, Watchlist};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CharmStore>,
    pub watchlist: Arc<Watchlist>,
    pub source: Arc<ScrapeClient>,
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    charms: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_unavailable" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_store_error(
    request_id: String,
    error: &charmtrack_store::StoreError,
) -> ApiError {
    tracing::error!(error = %error, "store operation failed");
    ApiError::new(request_id, "internal_error", "store operation failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

fn limited_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/charms",
            get(charms::list_charms).post(charms::create_charm),
        )
        .route("/api/v1/charms/{id}", get(charms::get_charm))
        .route(
            "/api/v1/charms/{id}/comparison",
            get(charms::get_comparison),
        )
        .route("/api/v1/charms/{id}/refresh", post(charms::refresh_charm))
        .route("/api/v1/market/trending", get(market::trending))
        .route("/api/v1/market/overview", get(market::overview))
        .route("/api/v1/watchlist", get(watchlist::list_watchlist))
        .route(
            "/api/v1/watchlist/{id}",
            put(watchlist::watch_charm).delete(watchlist::unwatch_charm),
        )
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(limited_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    (
        StatusCode::OK,
        Json(ApiResponse {
            data: HealthData {
                status: "ok",
                charms: state.store.len(),
            },
            meta,
        }),
    )
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use charmtrack_core::{Charm, CharmStatus, Listing, Material, Platform};
    use charmtrack_store::MemoryKeyValueStore;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    fn test_config() -> AppConfig {
        AppConfig {
            env: charmtrack_core::Environment::Test,
            bind_addr: "127.0.0.1:0".parse().expect("addr"),
            log_level: "warn".to_owned(),
            charms_path: "./config/charms.yaml".into(),
            source_base_url: "http://localhost:9".to_owned(),
            source_request_timeout_secs: 1,
            source_user_agent: "charmtrack-test/0.1".to_owned(),
            source_max_retries: 0,
            source_retry_backoff_base_secs: 0,
            refresh_interval_secs: 300,
            refresh_enabled: false,
            rate_limit_max_requests: 120,
            rate_limit_window_secs: 60,
        }
    }

    fn test_state() -> AppState {
        AppState {
            store: Arc::new(CharmStore::new()),
            watchlist: Arc::new(Watchlist::new(Box::new(MemoryKeyValueStore::new()))),
            source: Arc::new(
                ScrapeClient::new(1, "charmtrack-test/0.1", 0, 0).expect("client"),
            ),
            config: Arc::new(test_config()),
        }
    }

    fn seed_charm(state: &AppState, name: &str, reference: Option<&str>) -> Uuid {
        let charm = Charm::new(
            name.to_owned(),
            "A sterling silver charm.".to_owned(),
            Material::Silver,
            CharmStatus::Active,
            reference.map(|r| dec(r)),
        );
        state.store.insert(charm)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).expect("json parse");
        (status, json)
    }

    fn decimal_of(value: &serde_json::Value) -> Decimal {
        serde_json::from_value(value.clone()).expect("decimal value")
    }

    use tower::ServiceExt;

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_not_found_maps_to_404() {
        let response = ApiError::new("req-1", "not_found", "no such charm").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_catalog_size() {
        let state = test_state();
        seed_charm(&state, "Bow Charm", None);
        let app = build_app(state, default_rate_limit_state());

        let (status, json) = get_json(app, "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["charms"], 1);
    }

    #[tokio::test]
    async fn list_charms_returns_seeded_charm() {
        let state = test_state();
        seed_charm(&state, "Bow Charm", Some("44.00"));
        let app = build_app(state, default_rate_limit_state());

        let (status, json) = get_json(app, "/api/v1/charms").await;
        assert_eq!(status, StatusCode::OK);
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["name"], "Bow Charm");
        assert_eq!(data[0]["material"], "Silver");
    }

    #[tokio::test]
    async fn list_charms_search_filters_by_name() {
        let state = test_state();
        seed_charm(&state, "Bow Charm", None);
        seed_charm(&state, "Anchor Charm", None);
        let app = build_app(state, default_rate_limit_state());

        let (status, json) = get_json(app, "/api/v1/charms?search=bow").await;
        assert_eq!(status, StatusCode::OK);
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["name"], "Bow Charm");
    }

    #[tokio::test]
    async fn get_charm_returns_404_for_unknown_id() {
        let state = test_state();
        let app = build_app(state, default_rate_limit_state());
        let (status, json) =
            get_json(app, &format!("/api/v1/charms/{}", Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn comparison_reports_deltas_and_best_deal() {
        let state = test_state();
        let id = seed_charm(&state, "Bow Charm", Some("100"));
        state
            .store
            .apply_refresh(
                id,
                vec![
                    Listing::new(Platform::Ebay, dec("80")),
                    Listing::new(Platform::Etsy, dec("120")),
                ],
                Utc::now(),
            )
            .expect("refresh");
        let app = build_app(state, default_rate_limit_state());

        let (status, json) = get_json(app, &format!("/api/v1/charms/{id}/comparison")).await;
        assert_eq!(status, StatusCode::OK);

        let summaries = json["data"]["summaries"].as_array().expect("summaries");
        // Two marketplaces plus the synthetic reference row, reference last.
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[2]["platform"], "Reference");

        let deltas = json["data"]["deltas"].as_array().expect("deltas");
        let ebay = deltas
            .iter()
            .find(|d| d["platform"] == "eBay")
            .expect("eBay delta");
        assert_eq!(decimal_of(&ebay["amount"]), dec("-20"));
        assert_eq!(decimal_of(&ebay["percent"]), dec("-20.0"));
        assert_eq!(ebay["is_savings"], true);

        // Best deal excludes the reference row: eBay at 80, not Reference at 100.
        assert_eq!(json["data"]["best_deal"]["platform"], "eBay");
        assert_eq!(decimal_of(&json["data"]["best_deal"]["average"]), dec("80"));

        let rollup = &json["data"]["rollup"];
        assert_eq!(decimal_of(&rollup["lowest"]), dec("80"));
        assert_eq!(decimal_of(&rollup["highest"]), dec("120"));
        assert_eq!(decimal_of(&rollup["range"]), dec("40"));
        assert_eq!(rollup["total_listings"], 3);
    }

    #[tokio::test]
    async fn comparison_with_no_listings_is_ok_and_empty() {
        let state = test_state();
        let id = seed_charm(&state, "Bow Charm", None);
        let app = build_app(state, default_rate_limit_state());

        let (status, json) = get_json(app, &format!("/api/v1/charms/{id}/comparison")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["data"]["summaries"].as_array().expect("array").is_empty());
        assert!(json["data"]["deltas"].as_array().expect("array").is_empty());
        assert!(json["data"]["best_deal"].is_null());
        assert!(json["data"]["rollup"].is_null());
    }

    #[tokio::test]
    async fn create_charm_validates_name() {
        let state = test_state();
        let app = build_app(state, default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/charms")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "name": "   ",
                            "description": "x",
                            "material": "Silver",
                            "status": "Active"
                        })
                        .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let state = test_state();
        let app = build_app(state.clone(), default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/charms")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "name": "Texas Charm",
                            "description": "Lone star.",
                            "material": "Gold",
                            "status": "Retired",
                            "reference_price": "75.00"
                        })
                        .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        let id = json["data"]["id"].as_str().expect("id");

        let app = build_app(state, default_rate_limit_state());
        let (status, json) = get_json(app, &format!("/api/v1/charms/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["name"], "Texas Charm");
        assert_eq!(json["data"]["status"], "Retired");
    }

    #[tokio::test]
    async fn watchlist_put_then_delete() {
        let state = test_state();
        let id = seed_charm(&state, "Bow Charm", None);
        let app = build_app(state.clone(), default_rate_limit_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/api/v1/watchlist/{id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let app = build_app(state.clone(), default_rate_limit_state());
        let (status, json) = get_json(app, "/api/v1/watchlist").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["ids"].as_array().expect("ids").len(), 1);
        assert_eq!(json["data"]["charms"][0]["name"], "Bow Charm");

        let app = build_app(state.clone(), default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/watchlist/{id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let app = build_app(state, default_rate_limit_state());
        let (_, json) = get_json(app, "/api/v1/watchlist").await;
        assert!(json["data"]["ids"].as_array().expect("ids").is_empty());
    }

    #[tokio::test]
    async fn watchlist_rejects_unknown_charm() {
        let state = test_state();
        let app = build_app(state, default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/api/v1/watchlist/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn market_overview_counts_statuses() {
        let state = test_state();
        let active = seed_charm(&state, "Bow Charm", None);
        let mut retired = Charm::new(
            "Old Heart".to_owned(),
            "Gone.".to_owned(),
            Material::Gold,
            CharmStatus::Retired,
            None,
        );
        retired.avg_price = Some(dec("30"));
        state.store.insert(retired);
        state
            .store
            .apply_refresh(
                active,
                vec![Listing::new(Platform::Ebay, dec("10"))],
                Utc::now(),
            )
            .expect("refresh");
        let app = build_app(state, default_rate_limit_state());

        let (status, json) = get_json(app, "/api/v1/market/overview").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total_charms"], 2);
        assert_eq!(json["data"]["active_charms"], 1);
        assert_eq!(json["data"]["retired_charms"], 1);
        // Mean of the two charm averages: (10 + 30) / 2.
        assert_eq!(decimal_of(&json["data"]["average_price"]), dec("20.00"));
    }

    #[tokio::test]
    async fn market_trending_limits_to_six() {
        let state = test_state();
        for i in 0..8 {
            seed_charm(&state, &format!("Charm {i}"), None);
        }
        let app = build_app(state, default_rate_limit_state());

        let (status, json) = get_json(app, "/api/v1/market/trending").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().expect("data").len(), 6);
    }

    #[tokio::test]
    async fn rate_limit_rejects_requests_past_budget() {
        let state = test_state();
        let app = build_app(state, RateLimitState::new(1, Duration::from_secs(60)));

        let (status, _) = get_json(app.clone(), "/api/v1/charms").await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = get_json(app, "/api/v1/charms").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json["error"]["code"], "rate_limited");
    }

    #[tokio::test]
    async fn rate_limit_resets_after_window_elapses() {
        let state = test_state();
        let app = build_app(state, RateLimitState::new(1, Duration::from_millis(50)));

        let (status, _) = get_json(app.clone(), "/api/v1/charms").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = get_json(app.clone(), "/api/v1/charms").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let (status, _) = get_json(app, "/api/v1/charms").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn rate_limit_does_not_cover_health() {
        let state = test_state();
        let app = build_app(state, RateLimitState::new(1, Duration::from_secs(60)));

        let (status, _) = get_json(app.clone(), "/api/v1/charms").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = get_json(app.clone(), "/api/v1/charms").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        let (status, _) = get_json(app, "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn request_id_header_is_echoed() {
        let app = build_app(test_state(), default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .header("x-request-id", "req-abc")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(
            response.headers().get("x-request-id").expect("header"),
            "req-abc"
        );
    }

    #[tokio::test]
    async fn request_id_is_generated_when_absent() {
        let app = build_app(test_state(), default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let header = response
            .headers()
            .get("x-request-id")
            .expect("header")
            .to_str()
            .expect("header string");
        Uuid::parse_str(header).expect("generated request id is a uuid");
    }
}
