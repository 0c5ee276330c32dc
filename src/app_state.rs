//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{DiscoveryConfig, GatewayConfig};
use crate::domain::{Clock, EventStore, PhoneStore};
use crate::service::InstallationService;

/// Per-viewer streaming parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    /// Keepalive interval: one `ping` per tick on both streams.
    pub keepalive_interval: Duration,
    /// Snapshot cadence of the phone stream.
    pub phone_poll_interval: Duration,
    /// Queued state snapshots per viewer; past it the oldest are overwritten.
    pub buffer: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_secs(30),
            phone_poll_interval: Duration::from_millis(250),
            buffer: 64,
        }
    }
}

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Installation service for all store operations.
    pub service: Arc<InstallationService>,
    /// Streaming parameters.
    pub stream: StreamSettings,
    /// Sources for the URL phones use to reach this server.
    pub discovery: Arc<DiscoveryConfig>,
}

impl AppState {
    /// Builds both stores from `config` around `clock` and wires the service.
    #[must_use]
    pub fn from_config(config: &GatewayConfig, clock: Arc<dyn Clock>) -> Self {
        let events = Arc::new(EventStore::new(config.events, Arc::clone(&clock)));
        let phones = Arc::new(PhoneStore::new(config.phones, clock));
        Self {
            service: Arc::new(InstallationService::new(events, phones)),
            stream: StreamSettings {
                keepalive_interval: config.keepalive_interval,
                phone_poll_interval: config.phone_poll_interval,
                buffer: config.stream_buffer,
            },
            discovery: Arc::new(config.discovery.clone()),
        }
    }
}
