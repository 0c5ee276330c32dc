//! Scan-event ingest DTOs.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::{DeviceClass, NewScanEvent};
use crate::error::GatewayError;

/// Request body for `POST /api/events`.
///
/// `language`, `hour` and `deviceType` are required; `motion` is optional
/// and clamped to `[0, 1]`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScanEventRequest {
    /// Browser language tag, non-empty.
    #[serde(default)]
    pub language: Option<String>,
    /// Local hour on the device, 0–23.
    #[serde(default)]
    pub hour: Option<i64>,
    /// One of `mobile`, `tablet`, `desktop`.
    #[serde(default)]
    pub device_type: Option<String>,
    /// Normalized motion magnitude.
    #[serde(default)]
    pub motion: Option<f64>,
}

impl TryFrom<ScanEventRequest> for NewScanEvent {
    type Error = GatewayError;

    fn try_from(req: ScanEventRequest) -> Result<Self, Self::Error> {
        let language = req
            .language
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .ok_or_else(|| GatewayError::InvalidRequest("language is required".to_string()))?;

        let hour = req
            .hour
            .ok_or_else(|| GatewayError::InvalidRequest("hour is required".to_string()))?;
        let hour = u8::try_from(hour)
            .ok()
            .filter(|h| *h < 24)
            .ok_or_else(|| {
                GatewayError::InvalidRequest(format!("hour must be within 0-23, got {hour}"))
            })?;

        let device_class = req
            .device_type
            .ok_or_else(|| GatewayError::InvalidRequest("deviceType is required".to_string()))?
            .parse::<DeviceClass>()
            .map_err(|e| GatewayError::InvalidDeviceType(e.0))?;

        let motion = req.motion.filter(|m| m.is_finite()).map(|m| m.clamp(0.0, 1.0));

        Ok(Self {
            language,
            hour,
            device_class,
            motion,
        })
    }
}
