//! # olimpico-gateway
//!
//! Live-state backend for an interactive installation: phones join via a
//! QR code and post sensor updates and scan events; projected viewers
//! follow the aggregate and per-phone state over Server-Sent Events.
//!
//! All state is in memory. Every mutation recomputes the derived state and
//! notifies subscribers synchronously, so a viewer never observes an
//! update out of order.
//!
//! ## Architecture
//!
//! ```text
//! Phones (HTTP POST)          Viewers (SSE)
//!     │                           │
//!     ├── REST Handlers (api/)    ├── Stream adapters (stream/)
//!     │                           │
//!     └──── InstallationService (service/) ────┘
//!               │
//!     EventStore, PhoneStore (domain/)
//!               │
//!     SubscriberRegistry, Clock (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod service;
pub mod stream;
