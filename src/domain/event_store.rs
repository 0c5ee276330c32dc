//! In-memory scan-event log with derived aggregates.
//!
//! [`EventStore`] keeps the events of the last TTL window, rebuilds the
//! [`AggregateState`] from scratch after every change, and pushes that
//! state to its subscribers.
//!
//! # Concurrency
//!
//! One [`parking_lot::Mutex`] guards the log. It is held for the whole
//! mutate-then-notify sequence, so notifications leave in mutation order
//! and each one reflects every mutation before it. Listeners only queue
//! snapshots, so the lock is never held across I/O.

use std::sync::Arc;

use chrono::TimeDelta;
use parking_lot::Mutex;

use super::aggregate::AggregateState;
use super::clock::Clock;
use super::scan_event::{NewScanEvent, ScanEvent};
use super::subscription::{Listener, SubscriberRegistry, Subscription};

/// Timing parameters of an [`EventStore`].
///
/// The two windows are independent: an event stops counting as active
/// after `active_window` but keeps feeding the language and hour
/// statistics until `ttl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventStoreConfig {
    /// Age at which an event is evicted.
    pub ttl: TimeDelta,
    /// Age below which an event counts as an active user.
    pub active_window: TimeDelta,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            ttl: TimeDelta::seconds(300),
            active_window: TimeDelta::seconds(120),
        }
    }
}

#[derive(Debug)]
struct EventLog {
    events: Vec<ScanEvent>,
    aggregate: AggregateState,
}

/// Scan-event log plus aggregator and subscriber registry.
#[derive(Debug)]
pub struct EventStore {
    log: Mutex<EventLog>,
    subscribers: SubscriberRegistry<AggregateState>,
    config: EventStoreConfig,
    clock: Arc<dyn Clock>,
}

impl EventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(config: EventStoreConfig, clock: Arc<dyn Clock>) -> Self {
        let aggregate = AggregateState::baseline(clock.local_hour());
        Self {
            log: Mutex::new(EventLog {
                events: Vec::new(),
                aggregate,
            }),
            subscribers: SubscriberRegistry::new(),
            config,
            clock,
        }
    }

    /// Appends a new event and notifies subscribers.
    ///
    /// Expired events are swept first; the new event itself is never
    /// evicted by the call that created it. Returns the stored event.
    pub fn record(&self, new: NewScanEvent) -> ScanEvent {
        let mut log = self.log.lock();
        let now = self.clock.now();

        self.sweep(&mut log);
        let event = ScanEvent::stamp(new, now);
        log.events.push(event.clone());
        self.recompute(&mut log);

        self.subscribers.notify(&log.aggregate);
        event
    }

    /// Returns a copy of the aggregate state.
    ///
    /// With `skip_expiry == false` expired events are evicted first and
    /// the aggregate is rebuilt from the survivors. With `true` nothing
    /// is evicted; only the active count is refreshed.
    #[must_use]
    pub fn snapshot(&self, skip_expiry: bool) -> AggregateState {
        let mut log = self.log.lock();
        if !skip_expiry {
            self.sweep(&mut log);
        }
        self.recompute(&mut log);
        log.aggregate.clone()
    }

    /// Returns a copy of the live events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<ScanEvent> {
        let mut log = self.log.lock();
        self.sweep(&mut log);
        log.events.clone()
    }

    /// Clears the log back to the baseline and notifies subscribers.
    pub fn reset(&self) {
        let mut log = self.log.lock();
        log.events.clear();
        log.aggregate = AggregateState::baseline(self.clock.local_hour());
        self.subscribers.notify(&log.aggregate);
    }

    /// Registers `listener` and delivers one snapshot to it right away.
    ///
    /// The initial snapshot skips expiry, and it is delivered under the
    /// store lock, so it always precedes any mutation notification.
    pub fn subscribe(&self, listener: Arc<dyn Listener<AggregateState>>) -> Subscription {
        let mut log = self.log.lock();
        self.recompute(&mut log);

        if let Err(e) = listener.deliver(&log.aggregate) {
            tracing::debug!(error = %e, "initial state delivery dropped");
        }
        self.subscribers.register(listener)
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn sweep(&self, log: &mut EventLog) {
        let now = self.clock.now();
        let before = log.events.len();
        log.events.retain(|event| now - event.created_at < self.config.ttl);

        let evicted = before - log.events.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = log.events.len(), "expired scan events evicted");
        }
    }

    fn recompute(&self, log: &mut EventLog) {
        log.aggregate = AggregateState::compute(
            &log.events,
            self.clock.now(),
            self.config.active_window,
            self.clock.local_hour(),
        );
    }
}
