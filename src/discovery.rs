//! Public URL resolution for the QR code shown by the installation.
//!
//! Priority: explicit base URL, hosting-platform host, tunnel URL,
//! local network address, fallback placeholder.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use serde::Serialize;
use utoipa::ToSchema;

use crate::config::DiscoveryConfig;

/// Which source produced the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UrlSource {
    /// Explicitly configured base URL.
    Hosted,
    /// Host name provided by the hosting platform.
    Vercel,
    /// Configured tunnel.
    Tunnel,
    /// Local network address of this machine.
    Local,
    /// Nothing resolved.
    Fallback,
}

/// Resolved public URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ServerUrl {
    /// Base URL phones should open.
    pub url: String,
    /// Where the URL came from.
    #[serde(rename = "type")]
    pub source: UrlSource,
}

/// Picks the public URL from `config`, using `local_ip` for the
/// local-network step.
#[must_use]
pub fn resolve(config: &DiscoveryConfig, local_ip: Option<IpAddr>) -> ServerUrl {
    if let Some(url) = &config.base_url {
        return ServerUrl {
            url: url.clone(),
            source: UrlSource::Hosted,
        };
    }
    if let Some(host) = &config.platform_host {
        return ServerUrl {
            url: format!("https://{host}"),
            source: UrlSource::Vercel,
        };
    }
    if let Some(url) = &config.tunnel_url {
        return ServerUrl {
            url: url.clone(),
            source: UrlSource::Tunnel,
        };
    }
    if let Some(ip) = local_ip {
        return ServerUrl {
            url: format!("http://{ip}:{}", config.port),
            source: UrlSource::Local,
        };
    }
    ServerUrl {
        url: config.fallback_url.clone(),
        source: UrlSource::Fallback,
    }
}

/// Returns the IPv4 address of the interface used for outbound traffic.
///
/// Connecting a UDP socket sends nothing; it only selects a route.
/// Returns `None` offline or when the route is loopback.
#[must_use]
pub fn local_ipv4() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9)).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (ip.is_ipv4() && !ip.is_loopback() && !ip.is_unspecified()).then_some(ip)
}
