//! olimpico-gateway server entry point.
//!
//! Starts the Axum HTTP server with the REST and streaming endpoints.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use olimpico_gateway::api;
use olimpico_gateway::app_state::AppState;
use olimpico_gateway::config::{GatewayConfig, LogFormat};
use olimpico_gateway::discovery;
use olimpico_gateway::domain::{Clock, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(
        addr = %config.listen_addr,
        event_ttl_ms = config.events.ttl.num_milliseconds(),
        active_window_ms = config.events.active_window.num_milliseconds(),
        "starting olimpico-gateway"
    );

    // Build application state
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let app_state = AppState::from_config(&config, clock);

    let server_url = discovery::resolve(&config.discovery, discovery::local_ipv4());
    tracing::info!(url = %server_url.url, source = ?server_url.source, "phones join via");

    // Build router
    let app = api::build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
