//! System endpoints: health check, reset, server URL.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::dto::ResetResponse;
use crate::app_state::AppState;
use crate::discovery::{self, ServerUrl};

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    active_users: usize,
    phones: usize,
    state_viewers: usize,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, current timestamp, and live counts.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let events = state.service.events();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            active_users: events.snapshot(true).active_users,
            phones: state.service.phones().len(),
            state_viewers: events.subscriber_count(),
        }),
    )
}

/// `POST /api/reset` — Clear every phone and scan event.
#[utoipa::path(
    post,
    path = "/api/reset",
    tag = "System",
    summary = "Reset the installation",
    description = "Clears both stores. Connected state streams receive the baseline aggregate.",
    responses(
        (status = 200, description = "Stores cleared", body = ResetResponse),
    )
)]
pub async fn reset_handler(State(state): State<AppState>) -> Json<ResetResponse> {
    state.service.reset_all();
    Json(ResetResponse {
        success: true,
        message: "All phones and events cleared".to_string(),
    })
}

/// `GET /api/server-url` — URL phones should open, for the QR code.
#[utoipa::path(
    get,
    path = "/api/server-url",
    tag = "System",
    summary = "Resolve the public server URL",
    description = "Tries, in order: explicit base URL, hosting-platform host, tunnel URL, local network address, fallback.",
    responses(
        (status = 200, description = "Resolved URL and its source", body = ServerUrl),
    )
)]
pub async fn server_url_handler(State(state): State<AppState>) -> Json<ServerUrl> {
    let resolved = discovery::resolve(&state.discovery, discovery::local_ipv4());
    tracing::debug!(url = %resolved.url, source = ?resolved.source, "server url resolved");
    Json(resolved)
}

/// System routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/reset", post(reset_handler))
        .route("/api/server-url", get(server_url_handler))
}
