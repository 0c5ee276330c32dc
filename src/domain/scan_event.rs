//! Scan events: the immutable log entries behind the aggregate state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for a scan event.
///
/// Wraps a UUID v4 assigned by the event store when the event is
/// recorded. Clients never choose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct EventId(uuid::Uuid);

impl EventId {
    /// Creates a new random `EventId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Device class reported by the scanning browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Phone-sized viewport or mobile user agent.
    Mobile,
    /// Tablet-sized viewport.
    Tablet,
    /// Anything else.
    Desktop,
}

impl DeviceClass {
    /// Returns the wire name of the class.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the [`DeviceClass`] names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown device type: {0}")]
pub struct UnknownDeviceClass(pub String);

impl FromStr for DeviceClass {
    type Err = UnknownDeviceClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mobile" => Ok(Self::Mobile),
            "tablet" => Ok(Self::Tablet),
            "desktop" => Ok(Self::Desktop),
            other => Err(UnknownDeviceClass(other.to_string())),
        }
    }
}

/// Validated fields of a scan, before the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScanEvent {
    /// Browser language tag (e.g. `"es-AR"`).
    pub language: String,
    /// Local hour on the scanning device, 0–23.
    pub hour: u8,
    /// Device class.
    pub device_class: DeviceClass,
    /// Normalized motion magnitude in `[0, 1]`, when the device reported one.
    pub motion: Option<f64>,
}

/// A recorded scan. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    /// Store-assigned identifier.
    pub id: EventId,
    /// Browser language tag.
    pub language: String,
    /// Local hour on the scanning device, 0–23.
    pub hour: u8,
    /// Device class.
    #[serde(rename = "deviceType")]
    pub device_class: DeviceClass,
    /// Normalized motion magnitude, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion: Option<f64>,
    /// Creation instant (epoch milliseconds on the wire).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[schema(value_type = i64)]
    pub created_at: DateTime<Utc>,
}

impl ScanEvent {
    /// Stamps a [`NewScanEvent`] with a fresh id and the given instant.
    #[must_use]
    pub fn stamp(new: NewScanEvent, created_at: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new(),
            language: new.language,
            hour: new.hour,
            device_class: new.device_class,
            motion: new.motion,
            created_at,
        }
    }
}
