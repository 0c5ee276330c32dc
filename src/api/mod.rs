//! REST API layer: route handlers, DTOs, OpenAPI, and router composition.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::stream::handler::{phone_stream_handler, state_stream_handler};

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(handlers::routes())
        .route("/api/stream", get(state_stream_handler))
        .route("/api/phones/stream", get(phone_stream_handler))
}

/// Builds the application: every route, tracing and CORS layers, the
/// Swagger UI when enabled, and the shared state.
pub fn build_app(state: AppState) -> Router {
    let router = build_router();

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use crate::config::GatewayConfig;
    use crate::domain::{Clock, ManualClock};

    fn app() -> Router {
        let Ok(config) = GatewayConfig::from_lookup(|_| None) else {
            panic!("default config must parse");
        };
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_now());
        build_app(AppState::from_config(&config, clock))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        let Ok(req) = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
        else {
            panic!("request must build");
        };
        req
    }

    fn get(uri: &str) -> Request<Body> {
        let Ok(req) = Request::get(uri).body(Body::empty()) else {
            panic!("request must build");
        };
        req
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body must be readable");
        };
        serde_json::from_slice(&bytes).unwrap_or_default()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let Ok(response) = app().oneshot(get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["activeUsers"], 0);
    }

    #[tokio::test]
    async fn valid_event_is_acknowledged() {
        let body = r#"{"language":"en","hour":10,"deviceType":"mobile","motion":0.4}"#;
        let Ok(response) = app().oneshot(post_json("/api/events", body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({"success": true}));
    }

    #[tokio::test]
    async fn unknown_device_type_is_rejected() {
        let body = r#"{"language":"en","hour":10,"deviceType":"watch"}"#;
        let Ok(response) = app().oneshot(post_json("/api/events", body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], 1002);
    }

    #[tokio::test]
    async fn malformed_json_uses_error_shape() {
        let Ok(response) = app().oneshot(post_json("/api/events", "{not json")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], 1004);
    }

    #[tokio::test]
    async fn phone_without_id_is_rejected() {
        let Ok(response) = app().oneshot(post_json("/api/phone", r#"{"name":"x"}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], 1003);
    }

    #[tokio::test]
    async fn missing_phone_is_not_found() {
        let Ok(response) = app().oneshot(get("/api/phone/ghost")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], 2001);
    }

    #[tokio::test]
    async fn state_stream_is_event_stream() {
        let Ok(response) = app().oneshot(get("/api/stream")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/event-stream"));
    }

    #[tokio::test]
    async fn server_url_reports_source() {
        let Ok(response) = app().oneshot(get("/api/server-url")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["url"].is_string());
        assert!(json["type"].is_string());
    }
}
