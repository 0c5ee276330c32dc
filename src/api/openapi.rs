//! OpenAPI document for the REST and streaming endpoints.

use utoipa::OpenApi;

use super::handlers::{events, phone, system};
use crate::stream::handler as stream;

/// Generated OpenAPI description. Schemas referenced by the paths are
/// collected automatically.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "olimpico-gateway",
        description = "Ingest and live broadcast for the interactive installation: phones post sensor updates and scan events, viewers follow aggregate and per-phone state over Server-Sent Events."
    ),
    paths(
        events::record_event,
        events::get_state,
        phone::upsert_phone,
        phone::list_phones,
        phone::get_phone,
        phone::delete_phone,
        system::health_handler,
        system::reset_handler,
        system::server_url_handler,
        stream::state_stream_handler,
        stream::phone_stream_handler,
    ),
    tags(
        (name = "Events", description = "Scan events and aggregate state"),
        (name = "Phones", description = "Per-phone sensor state"),
        (name = "Streams", description = "Server-Sent Event streams for viewers"),
        (name = "System", description = "Health, reset, discovery"),
    )
)]
pub struct ApiDoc;
