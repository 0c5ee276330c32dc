//! Scan-event handlers: ingest and aggregate state.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{AckResponse, ScanEventRequest};
use crate::app_state::AppState;
use crate::domain::AggregateState;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /api/events` — Record one scan event.
///
/// # Errors
///
/// Returns [`GatewayError`] when the body is malformed or a field fails
/// validation. Nothing is recorded in that case.
#[utoipa::path(
    post,
    path = "/api/events",
    tag = "Events",
    summary = "Record a scan event",
    description = "Appends one scan event (language, local hour, device type, optional motion) to the log. Connected state streams receive the recomputed aggregate.",
    request_body = ScanEventRequest,
    responses(
        (status = 200, description = "Event recorded", body = AckResponse),
        (status = 400, description = "Malformed or invalid event", body = ErrorResponse),
    )
)]
pub async fn record_event(
    State(state): State<AppState>,
    payload: Result<Json<ScanEventRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(req) = payload?;
    state.service.record_scan(req)?;
    Ok(Json(AckResponse::OK))
}

/// `GET /api/state` — Current aggregate state.
#[utoipa::path(
    get,
    path = "/api/state",
    tag = "Events",
    summary = "Get aggregate state",
    description = "Sweeps expired events and returns the recomputed aggregate: active users, languages, average hour and motion.",
    responses(
        (status = 200, description = "Aggregate state", body = AggregateState),
    )
)]
pub async fn get_state(State(state): State<AppState>) -> Json<AggregateState> {
    Json(state.service.installation_state())
}

/// Scan-event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/events", post(record_event))
        .route("/api/state", get(get_state))
}
