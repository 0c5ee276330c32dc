//! Axum SSE handlers for the two viewer streams.

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures_util::{Stream, StreamExt};

use super::{PhoneStream, StateStream};
use crate::app_state::AppState;

/// `GET /api/stream` — Aggregate state as Server-Sent Events.
///
/// Frames carry `connected`, then `state` on every change, and `ping`
/// on every tick of the keepalive interval.
#[utoipa::path(
    get,
    path = "/api/stream",
    tag = "Streams",
    summary = "Aggregate state stream",
    description = "Server-Sent Events. The first frame is `{\"type\":\"connected\"}`, followed by the current state and every later change as `{\"type\":\"state\",\"data\":{..}}`. A `ping` frame is sent on every tick of the keepalive interval.",
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream", body = String),
    )
)]
pub async fn state_stream_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = StateStream::open(
        state.service.events(),
        state.stream.keepalive_interval,
        state.stream.buffer,
    );
    Sse::new(stream.map(|msg| msg.to_sse_event()))
}

/// `GET /api/phones/stream` — Phone records as Server-Sent Events.
#[utoipa::path(
    get,
    path = "/api/phones/stream",
    tag = "Streams",
    summary = "Phone record stream",
    description = "Server-Sent Events. The first frame is `{\"type\":\"connected\"}`, then `{\"type\":\"phones\",\"phones\":[..],\"activePhones\":n}` at a fixed cadence, with periodic `ping` frames.",
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream", body = String),
    )
)]
pub async fn phone_stream_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = PhoneStream::open(
        Arc::clone(state.service.phones()),
        state.stream.phone_poll_interval,
        state.stream.keepalive_interval,
    );
    Sse::new(stream.map(|msg| msg.to_sse_event()))
}
