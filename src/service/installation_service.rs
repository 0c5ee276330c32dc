//! Installation service: validates ingest requests, mutates the stores,
//! and logs what happened.

use std::sync::Arc;

use crate::api::dto::{PhoneUpdateRequest, ScanEventRequest};
use crate::domain::{
    AggregateState, DeviceRecord, EventStore, NewScanEvent, PhoneSnapshot, PhoneStore, ScanEvent,
    UpsertOutcome,
};
use crate::error::GatewayError;

/// Orchestration layer for all store operations.
///
/// Stateless coordinator: owns handles to the [`EventStore`] and the
/// [`PhoneStore`]. Every ingest method follows the pattern: validate →
/// mutate store (which notifies its subscribers) → log → return result.
/// Validation always completes before the store is touched.
#[derive(Debug, Clone)]
pub struct InstallationService {
    events: Arc<EventStore>,
    phones: Arc<PhoneStore>,
}

impl InstallationService {
    /// Creates a new `InstallationService`.
    #[must_use]
    pub fn new(events: Arc<EventStore>, phones: Arc<PhoneStore>) -> Self {
        Self { events, phones }
    }

    /// Returns the scan-event store.
    #[must_use]
    pub fn events(&self) -> &Arc<EventStore> {
        &self.events
    }

    /// Returns the phone store.
    #[must_use]
    pub fn phones(&self) -> &Arc<PhoneStore> {
        &self.phones
    }

    /// Validates and records a scan event.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] or
    /// [`GatewayError::InvalidDeviceType`] when the request does not
    /// validate. Nothing is recorded in that case.
    pub fn record_scan(&self, req: ScanEventRequest) -> Result<ScanEvent, GatewayError> {
        let new = NewScanEvent::try_from(req)?;
        let event = self.events.record(new);

        tracing::info!(
            event_id = %event.id,
            language = %event.language,
            hour = event.hour,
            device_type = %event.device_class,
            motion = ?event.motion,
            "scan event recorded"
        );
        Ok(event)
    }

    /// Validates and upserts a phone update.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingConnectionId`] when the request has
    /// no id.
    pub fn upsert_phone(
        &self,
        req: PhoneUpdateRequest,
    ) -> Result<(UpsertOutcome, DeviceRecord), GatewayError> {
        let (id, update) = req.into_parts()?;
        let has_gyro = update.gyroscope.is_some();
        let (outcome, record) = self.phones.upsert(&id, update);

        match outcome {
            UpsertOutcome::Inserted => {
                tracing::info!(phone = %id, total = self.phones.len(), "phone connected");
            }
            UpsertOutcome::Updated => {
                tracing::debug!(phone = %id, has_gyro, "phone updated");
            }
        }
        Ok((outcome, record))
    }

    /// Returns the aggregate state after sweeping expired events.
    #[must_use]
    pub fn installation_state(&self) -> AggregateState {
        self.events.snapshot(false)
    }

    /// Returns every live phone plus the active count.
    #[must_use]
    pub fn phone_snapshot(&self) -> PhoneSnapshot {
        self.phones.snapshot()
    }

    /// Returns the record for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PhoneNotFound`] if no live record exists.
    pub fn phone(&self, id: &str) -> Result<DeviceRecord, GatewayError> {
        self.phones
            .get(id)
            .ok_or_else(|| GatewayError::PhoneNotFound(id.to_string()))
    }

    /// Evicts the record for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PhoneNotFound`] if no record exists.
    pub fn remove_phone(&self, id: &str) -> Result<DeviceRecord, GatewayError> {
        let removed = self
            .phones
            .remove(id)
            .ok_or_else(|| GatewayError::PhoneNotFound(id.to_string()))?;
        tracing::info!(phone = %id, "phone removed");
        Ok(removed)
    }

    /// Clears both stores back to their baseline.
    pub fn reset_all(&self) {
        self.phones.clear();
        self.events.reset();
        tracing::warn!("installation reset: all phones and scan events cleared");
    }
}
