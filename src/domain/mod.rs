//! Domain layer: record types, aggregation, subscriptions, and the stores.
//!
//! This module contains the in-memory core of the installation: the
//! scan-event log with its derived [`AggregateState`], the per-phone
//! [`PhoneStore`], the [`SubscriberRegistry`] both stores notify through,
//! and the [`Clock`] every timestamp comes from.

pub mod aggregate;
pub mod clock;
pub mod device_record;
pub mod event_store;
pub mod phone_store;
pub mod scan_event;
pub mod subscription;

pub use aggregate::AggregateState;
pub use clock::{Clock, ManualClock, SystemClock};
pub use device_record::{DeviceRecord, DeviceUpdate, Location, Orientation};
pub use event_store::{EventStore, EventStoreConfig};
pub use phone_store::{PhoneSnapshot, PhoneStore, PhoneStoreConfig, UpsertOutcome};
pub use scan_event::{DeviceClass, EventId, NewScanEvent, ScanEvent};
pub use subscription::{DeliveryError, Listener, SubscriberRegistry, Subscription};
