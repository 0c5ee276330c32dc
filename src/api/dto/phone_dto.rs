//! Phone ingest DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{DeviceUpdate, Location, Orientation, UpsertOutcome};
use crate::error::GatewayError;

/// Request body for `POST /api/phone`.
///
/// Only `id` is required. Every other field is optional; fields left out
/// keep the value stored by a previous update.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PhoneUpdateRequest {
    /// Connection id generated by the phone page.
    #[serde(default)]
    pub id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Selfie as a data URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Browser user agent.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Browser platform.
    #[serde(default)]
    pub platform: Option<String>,
    /// Browser language tag.
    #[serde(default)]
    pub language: Option<String>,
    /// Screen width in CSS pixels.
    #[serde(default)]
    pub screen_width: Option<u32>,
    /// Screen height in CSS pixels.
    #[serde(default)]
    pub screen_height: Option<u32>,
    /// Geolocation reading.
    #[serde(default)]
    pub location: Option<Location>,
    /// Orientation reading.
    #[serde(default)]
    pub gyroscope: Option<Orientation>,
    /// Whether the orientation is frozen.
    #[serde(default)]
    pub frozen: Option<bool>,
}

impl PhoneUpdateRequest {
    /// Splits the request into connection id and update.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingConnectionId`] if `id` is absent or
    /// blank.
    pub fn into_parts(self) -> Result<(String, DeviceUpdate), GatewayError> {
        let id = self
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(GatewayError::MissingConnectionId)?;

        let update = DeviceUpdate {
            name: self.name,
            image: self.image,
            user_agent: self.user_agent,
            platform: self.platform,
            language: self.language,
            screen_width: self.screen_width,
            screen_height: self.screen_height,
            location: self.location,
            gyroscope: self.gyroscope,
            frozen: self.frozen,
        };
        Ok((id, update))
    }
}

/// Response body for `POST /api/phone`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PhoneAckResponse {
    /// Always `true`.
    pub success: bool,
    /// Connection id that was upserted.
    pub id: String,
    /// `inserted` or `updated`.
    pub outcome: UpsertOutcome,
}
