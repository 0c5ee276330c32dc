//! Service layer: business logic orchestration.
//!
//! [`InstallationService`] validates ingest requests, applies them to the
//! stores in [`super::domain`], and logs each mutation.

pub mod installation_service;

pub use installation_service::InstallationService;
