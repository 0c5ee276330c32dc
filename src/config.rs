//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Parsing goes through a lookup
//! function so it can be exercised without touching the process
//! environment.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::TimeDelta;

use crate::domain::{EventStoreConfig, PhoneStoreConfig};

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `LISTEN_ADDR` (or `0.0.0.0:$PORT`) is not a socket address.
    #[error("invalid listen address {value:?}: {source}")]
    InvalidListenAddr {
        /// The offending value.
        value: String,
        /// Parser error.
        source: std::net::AddrParseError,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Sources for the public URL handed out in QR codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Explicit public URL (`BASE_URL` or `PUBLIC_BASE_URL`).
    pub base_url: Option<String>,
    /// Host name provided by the hosting platform (`VERCEL_URL`).
    pub platform_host: Option<String>,
    /// Tunnel URL (`TUNNEL_URL`).
    pub tunnel_url: Option<String>,
    /// Port used to build the local-network URL.
    pub port: u16,
    /// Placeholder when nothing else resolves (`FALLBACK_URL`).
    pub fallback_url: String,
}

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Scan-event TTL and active window.
    pub events: EventStoreConfig,

    /// Phone-record TTL and active window.
    pub phones: PhoneStoreConfig,

    /// Interval between `ping` messages on state streams.
    pub keepalive_interval: Duration,

    /// Interval between phone snapshots on phone streams.
    pub phone_poll_interval: Duration,

    /// Per-viewer queue length for state snapshots.
    pub stream_buffer: usize,

    /// QR target URL sources.
    pub discovery: DiscoveryConfig,

    /// Log output format.
    pub log_format: LogFormat,
}

const DEFAULT_PORT: u16 = 3000;
const MIN_PHONE_POLL_MS: u64 = 100;
const MAX_PHONE_POLL_MS: u64 = 1_000;

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidListenAddr`] if the listen address
    /// cannot be parsed as a [`SocketAddr`].
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidListenAddr`] if the listen address
    /// cannot be parsed as a [`SocketAddr`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_var(&lookup, "PORT", DEFAULT_PORT);
        let listen_value = lookup("LISTEN_ADDR").unwrap_or_else(|| format!("0.0.0.0:{port}"));
        let listen_addr: SocketAddr = listen_value.parse().map_err(|source| {
            ConfigError::InvalidListenAddr {
                value: listen_value.clone(),
                source,
            }
        })?;

        let event_ttl_ms: i64 = parse_var(&lookup, "EVENT_TTL", 300_000);
        let active_window_ms: i64 = parse_var(&lookup, "ACTIVE_WINDOW_MS", 120_000);
        let phone_ttl_ms: i64 = parse_var(&lookup, "PHONE_TTL_MS", 300_000);

        let active_window = TimeDelta::milliseconds(active_window_ms.max(0));
        let events = EventStoreConfig {
            ttl: TimeDelta::milliseconds(event_ttl_ms.max(0)),
            active_window,
        };
        let phones = PhoneStoreConfig {
            ttl: (phone_ttl_ms > 0).then(|| TimeDelta::milliseconds(phone_ttl_ms)),
            active_window,
        };

        let keepalive_secs: u64 = parse_var(&lookup, "KEEPALIVE_INTERVAL_SECS", 30);
        let phone_poll_ms: u64 = parse_var(&lookup, "PHONE_POLL_INTERVAL_MS", 250);
        let stream_buffer: usize = parse_var(&lookup, "STREAM_BUFFER", 64);

        let discovery = DiscoveryConfig {
            base_url: non_empty(&lookup, "BASE_URL")
                .or_else(|| non_empty(&lookup, "PUBLIC_BASE_URL")),
            platform_host: non_empty(&lookup, "VERCEL_URL"),
            tunnel_url: non_empty(&lookup, "TUNNEL_URL"),
            port: listen_addr.port(),
            fallback_url: non_empty(&lookup, "FALLBACK_URL")
                .unwrap_or_else(|| format!("http://localhost:{DEFAULT_PORT}")),
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            listen_addr,
            events,
            phones,
            keepalive_interval: Duration::from_secs(keepalive_secs.max(1)),
            phone_poll_interval: Duration::from_millis(
                phone_poll_ms.clamp(MIN_PHONE_POLL_MS, MAX_PHONE_POLL_MS),
            ),
            stream_buffer: stream_buffer.max(1),
            discovery,
            log_format,
        })
    }
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Returns the variable if it is set to something other than whitespace.
fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
