//! HTTP routes
//!
//! # Endpoints
//!
//! - `GET /` - Service information
//! - `GET /api/v1/health` - Health check
//! - `GET /lastfm.php` - Cached recent tracks (path used by the frontend proxy)
//! - `GET /api/v1/recent-tracks` - Same as `/lastfm.php`

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::ApiError;
use crate::gate::{CacheGate, ResponseEnvelope};

pub const RECENT_TRACKS_PATH: &str = "/lastfm.php";
pub const RECENT_TRACKS_API_PATH: &str = "/api/v1/recent-tracks";
pub const HEALTH_PATH: &str = "/api/v1/health";

const SERVICE_NAME: &str = "nowplaying";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<CacheGate>,
}

impl AppState {
    pub fn new(gate: CacheGate) -> Self {
        Self {
            gate: Arc::new(gate),
        }
    }
}

/// Builds the router with tracing and permissive CORS
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(info))
        .route(HEALTH_PATH, get(health))
        .route(RECENT_TRACKS_PATH, get(recent_tracks))
        .route(RECENT_TRACKS_API_PATH, get(recent_tracks))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /lastfm.php - Recent tracks through the cache gate.
pub async fn recent_tracks(
    State(state): State<AppState>,
) -> Result<Json<ResponseEnvelope>, ApiError> {
    let envelope = state.gate.handle_request().await?;
    Ok(Json(envelope))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
}

/// GET /api/v1/health - Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: SERVICE_NAME,
    })
}

/// API information response.
#[derive(Debug, Serialize)]
pub struct ApiInfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub cache_duration_secs: i64,
    pub endpoints: Vec<EndpointInfo>,
}

/// Endpoint information.
#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

/// GET / - API information endpoint.
pub async fn info(State(state): State<AppState>) -> Json<ApiInfoResponse> {
    Json(ApiInfoResponse {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        description: env!("CARGO_PKG_DESCRIPTION"),
        cache_duration_secs: state.gate.ttl().num_seconds(),
        endpoints: vec![
            EndpointInfo {
                method: "GET",
                path: HEALTH_PATH,
                description: "Health check endpoint",
            },
            EndpointInfo {
                method: "GET",
                path: RECENT_TRACKS_PATH,
                description: "Recent tracks with cache_status and cache_expires",
            },
            EndpointInfo {
                method: "GET",
                path: RECENT_TRACKS_API_PATH,
                description: "Alias of /lastfm.php",
            },
        ],
    })
}
