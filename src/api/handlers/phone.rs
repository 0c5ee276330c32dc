//! Phone handlers: ingest, listing, lookup, eviction.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{AckResponse, PhoneAckResponse, PhoneUpdateRequest};
use crate::app_state::AppState;
use crate::domain::{DeviceRecord, PhoneSnapshot, UpsertOutcome};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /api/phone` — Upsert a phone's latest state.
///
/// Responds `201 Created` for a new connection id, `200 OK` for an update.
///
/// # Errors
///
/// Returns [`GatewayError`] when the body is malformed or has no id.
#[utoipa::path(
    post,
    path = "/api/phone",
    tag = "Phones",
    summary = "Upsert a phone",
    description = "Creates or merges the record for `id`. Fields absent from the body keep their previous values; `lastUpdate` is refreshed.",
    request_body = PhoneUpdateRequest,
    responses(
        (status = 201, description = "New phone recorded", body = PhoneAckResponse),
        (status = 200, description = "Existing phone updated", body = PhoneAckResponse),
        (status = 400, description = "Malformed body or missing id", body = ErrorResponse),
    )
)]
pub async fn upsert_phone(
    State(state): State<AppState>,
    payload: Result<Json<PhoneUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(req) = payload?;
    let (outcome, record) = state.service.upsert_phone(req)?;

    let status = match outcome {
        UpsertOutcome::Inserted => StatusCode::CREATED,
        UpsertOutcome::Updated => StatusCode::OK,
    };
    let response = PhoneAckResponse {
        success: true,
        id: record.id,
        outcome,
    };
    Ok((status, Json(response)))
}

/// `GET /api/phones` — Every live phone plus the active count.
#[utoipa::path(
    get,
    path = "/api/phones",
    tag = "Phones",
    summary = "List phones",
    description = "Sweeps expired records and returns the rest in first-seen order.",
    responses(
        (status = 200, description = "Phone snapshot", body = PhoneSnapshot),
    )
)]
pub async fn list_phones(State(state): State<AppState>) -> Json<PhoneSnapshot> {
    Json(state.service.phone_snapshot())
}

/// `GET /api/phone/{id}` — One phone record.
///
/// # Errors
///
/// Returns [`GatewayError::PhoneNotFound`] if no live record exists.
#[utoipa::path(
    get,
    path = "/api/phone/{id}",
    tag = "Phones",
    summary = "Get a phone",
    params(
        ("id" = String, Path, description = "Connection id"),
    ),
    responses(
        (status = 200, description = "Phone record", body = DeviceRecord),
        (status = 404, description = "Phone not found", body = ErrorResponse),
    )
)]
pub async fn get_phone(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeviceRecord>, GatewayError> {
    state.service.phone(&id).map(Json)
}

/// `DELETE /api/phone/{id}` — Evict a phone record.
///
/// # Errors
///
/// Returns [`GatewayError::PhoneNotFound`] if no record exists.
#[utoipa::path(
    delete,
    path = "/api/phone/{id}",
    tag = "Phones",
    summary = "Remove a phone",
    params(
        ("id" = String, Path, description = "Connection id"),
    ),
    responses(
        (status = 200, description = "Phone removed", body = AckResponse),
        (status = 404, description = "Phone not found", body = ErrorResponse),
    )
)]
pub async fn delete_phone(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AckResponse>, GatewayError> {
    state.service.remove_phone(&id)?;
    Ok(Json(AckResponse::OK))
}

/// Phone routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/phone", post(upsert_phone))
        .route("/api/phones", get(list_phones))
        .route("/api/phone/{id}", get(get_phone).delete(delete_phone))
}
