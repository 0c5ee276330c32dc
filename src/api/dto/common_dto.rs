//! Shared DTO types used across multiple endpoints.

use serde::Serialize;
use utoipa::ToSchema;

/// Minimal success acknowledgment.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AckResponse {
    /// Always `true`.
    pub success: bool,
}

impl AckResponse {
    /// The one acknowledgment value.
    pub const OK: Self = Self { success: true };
}

/// Response body for `POST /api/reset`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResetResponse {
    /// Always `true`.
    pub success: bool,
    /// Human-readable confirmation.
    pub message: String,
}
