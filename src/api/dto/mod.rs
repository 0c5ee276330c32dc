//! Data Transfer Objects for REST request/response serialization.
//!
//! Request DTOs keep every field optional so that missing fields can be
//! reported with a precise [`crate::error::GatewayError`] instead of a
//! generic deserialization failure. Unknown fields are rejected.

pub mod common_dto;
pub mod event_dto;
pub mod phone_dto;

pub use common_dto::*;
pub use event_dto::*;
pub use phone_dto::*;
