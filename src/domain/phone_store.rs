//! Latest-known state per connected phone.
//!
//! [`PhoneStore`] maps connection ids to [`DeviceRecord`]s in insertion
//! order. Records not updated for longer than the configured TTL are
//! dropped lazily, on upsert and on read. Like the event store it guards
//! its table with a single mutex and notifies subscribers after each
//! mutation; the phone stream itself polls [`PhoneStore::snapshot`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use utoipa::ToSchema;

use super::clock::Clock;
use super::device_record::{DeviceRecord, DeviceUpdate};
use super::subscription::{Listener, SubscriberRegistry, Subscription};

/// Timing parameters of a [`PhoneStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhoneStoreConfig {
    /// Age since `last_update` at which a record is evicted. `None` keeps
    /// records until removed or cleared.
    pub ttl: Option<TimeDelta>,
    /// Age since `last_update` below which a phone counts as active.
    pub active_window: TimeDelta,
}

impl Default for PhoneStoreConfig {
    fn default() -> Self {
        Self {
            ttl: Some(TimeDelta::seconds(300)),
            active_window: TimeDelta::seconds(120),
        }
    }
}

/// Whether an upsert created or updated a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// First update for this id.
    Inserted,
    /// Merged onto an existing record.
    Updated,
}

/// Copy of the phone table pushed to viewers.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhoneSnapshot {
    /// All live records, in insertion order.
    pub phones: Vec<DeviceRecord>,
    /// Records updated within the active window.
    pub active_phones: usize,
}

#[derive(Debug, Default)]
struct PhoneTable {
    records: HashMap<String, DeviceRecord>,
    order: Vec<String>,
}

impl PhoneTable {
    fn ordered(&self) -> Vec<DeviceRecord> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .cloned()
            .collect()
    }

    fn remove(&mut self, id: &str) -> Option<DeviceRecord> {
        let removed = self.records.remove(id)?;
        self.order.retain(|other| other != id);
        Some(removed)
    }

    fn active(&self, now: DateTime<Utc>, window: TimeDelta) -> usize {
        self.records
            .values()
            .filter(|record| now - record.last_update < window)
            .count()
    }
}

/// Connection-id keyed store of [`DeviceRecord`]s.
#[derive(Debug)]
pub struct PhoneStore {
    table: Mutex<PhoneTable>,
    subscribers: SubscriberRegistry<PhoneSnapshot>,
    config: PhoneStoreConfig,
    clock: Arc<dyn Clock>,
}

impl PhoneStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(config: PhoneStoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            table: Mutex::new(PhoneTable::default()),
            subscribers: SubscriberRegistry::new(),
            config,
            clock,
        }
    }

    /// Inserts or merges the record for `id`.
    ///
    /// A new record gets `first_seen = now`; an existing one keeps its
    /// `first_seen` and receives the fields present in `update`. Both
    /// paths set `last_update = now`. Returns the outcome and a copy of
    /// the stored record.
    pub fn upsert(&self, id: &str, update: DeviceUpdate) -> (UpsertOutcome, DeviceRecord) {
        let mut guard = self.table.lock();
        let table = &mut *guard;
        let now = self.clock.now();
        self.sweep(table);

        let (outcome, record) = match table.records.get_mut(id) {
            Some(existing) => {
                existing.merge(update, now);
                (UpsertOutcome::Updated, existing.clone())
            }
            None => {
                let record = DeviceRecord::create(id.to_string(), update, now);
                table.order.push(id.to_string());
                table.records.insert(id.to_string(), record.clone());
                (UpsertOutcome::Inserted, record)
            }
        };

        self.notify(table);
        (outcome, record)
    }

    /// Returns a copy of the record for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<DeviceRecord> {
        let mut table = self.table.lock();
        self.sweep(&mut table);
        table.records.get(id).cloned()
    }

    /// Returns copies of all live records in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<DeviceRecord> {
        let mut table = self.table.lock();
        self.sweep(&mut table);
        table.ordered()
    }

    /// Returns all live records plus the active count.
    #[must_use]
    pub fn snapshot(&self) -> PhoneSnapshot {
        let mut table = self.table.lock();
        self.sweep(&mut table);
        self.snapshot_of(&table)
    }

    /// Returns the number of phones updated within the active window.
    #[must_use]
    pub fn active_count(&self) -> usize {
        let table = self.table.lock();
        table.active(self.clock.now(), self.config.active_window)
    }

    /// Returns the number of stored records, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock().records.len()
    }

    /// Returns `true` if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.lock().records.is_empty()
    }

    /// Evicts the record for `id`, returning it.
    pub fn remove(&self, id: &str) -> Option<DeviceRecord> {
        let mut table = self.table.lock();
        let removed = table.remove(id);
        if removed.is_some() {
            self.notify(&table);
        }
        removed
    }

    /// Drops every record.
    pub fn clear(&self) {
        let mut table = self.table.lock();
        table.records.clear();
        table.order.clear();
        self.notify(&table);
    }

    /// Registers `listener` and delivers one snapshot to it right away.
    pub fn subscribe(&self, listener: Arc<dyn Listener<PhoneSnapshot>>) -> Subscription {
        let table = self.table.lock();
        if let Err(e) = listener.deliver(&self.snapshot_of(&table)) {
            tracing::debug!(error = %e, "initial phone snapshot dropped");
        }
        self.subscribers.register(listener)
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn snapshot_of(&self, table: &PhoneTable) -> PhoneSnapshot {
        PhoneSnapshot {
            phones: table.ordered(),
            active_phones: table.active(self.clock.now(), self.config.active_window),
        }
    }

    fn notify(&self, table: &PhoneTable) {
        // phones post at 10 Hz; skip building a snapshot nobody reads
        if self.subscribers.is_empty() {
            return;
        }
        self.subscribers.notify(&self.snapshot_of(table));
    }

    fn sweep(&self, table: &mut PhoneTable) {
        let Some(ttl) = self.config.ttl else {
            return;
        };
        let now = self.clock.now();
        let expired: Vec<String> = table
            .records
            .values()
            .filter(|record| now - record.last_update >= ttl)
            .map(|record| record.id.clone())
            .collect();

        for id in &expired {
            table.remove(id);
        }
        if !expired.is_empty() {
            tracing::debug!(evicted = expired.len(), "stale phones evicted");
        }
    }
}
