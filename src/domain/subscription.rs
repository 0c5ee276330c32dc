//! Listener registry shared by both stores.
//!
//! A store owns one [`SubscriberRegistry`] per state type. Registering a
//! [`Listener`] returns a [`Subscription`] handle; dropping the handle or
//! calling [`Subscription::unsubscribe`] removes the listener. Removal is
//! idempotent and safe while a notification is being delivered, because
//! [`SubscriberRegistry::notify`] delivers to a copy of the listener list
//! taken before the first delivery.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Why a listener refused a state delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The receiving side is gone (viewer disconnected).
    #[error("listener closed")]
    Closed,
}

/// Receives state snapshots from a store.
///
/// Implementations must not block: they are called while the store's
/// lock is held.
pub trait Listener<T>: Send + Sync {
    /// Hands `state` to the listener.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] when the snapshot could not be queued.
    /// The registry logs and drops the error.
    fn deliver(&self, state: &T) -> Result<(), DeliveryError>;
}

/// A bounded per-viewer queue. When the viewer falls behind, the oldest
/// queued snapshots are overwritten, so the newest state is always the
/// last one it receives.
impl<T: Clone + Send + 'static> Listener<T> for broadcast::Sender<T> {
    fn deliver(&self, state: &T) -> Result<(), DeliveryError> {
        self.send(state.clone())
            .map(|_| ())
            .map_err(|_| DeliveryError::Closed)
    }
}

/// Identifier of a registered listener, unique per registry.
pub type ListenerId = u64;

trait Deregister: Send + Sync {
    fn deregister(&self, id: ListenerId) -> bool;
}

struct RegistryInner<T> {
    listeners: Mutex<BTreeMap<ListenerId, Arc<dyn Listener<T>>>>,
    next_id: AtomicU64,
}

impl<T: 'static> Deregister for RegistryInner<T> {
    fn deregister(&self, id: ListenerId) -> bool {
        self.listeners.lock().remove(&id).is_some()
    }
}

/// Set of listeners interested in one kind of state.
pub struct SubscriberRegistry<T> {
    inner: Arc<RegistryInner<T>>,
}

impl<T: 'static> SubscriberRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                listeners: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Adds `listener` and returns the handle that removes it.
    ///
    /// Delivering the initial snapshot is the caller's job, so the store
    /// can do it under its own lock.
    pub fn register(&self, listener: Arc<dyn Listener<T>>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().insert(id, listener);

        let inner: Arc<dyn Deregister> = Arc::clone(&self.inner) as Arc<dyn Deregister>;
        Subscription {
            id,
            registry: Arc::downgrade(&inner),
            active: AtomicBool::new(true),
        }
    }

    /// Delivers `state` to every listener registered when the call starts.
    ///
    /// A failing listener never stops delivery to the others. Returns the
    /// number of successful deliveries.
    pub fn notify(&self, state: &T) -> usize {
        let targets: Vec<(ListenerId, Arc<dyn Listener<T>>)> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        let mut delivered = 0;
        for (id, listener) in targets {
            match listener.deliver(state) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::debug!(listener = id, error = %e, "state delivery dropped"),
            }
        }
        delivered
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Returns `true` if nobody is listening.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.listeners.lock().is_empty()
    }
}

impl<T: 'static> Default for SubscriberRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SubscriberRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("listeners", &self.inner.listeners.lock().len())
            .finish()
    }
}

/// Handle for one registered listener.
///
/// Dropping it unsubscribes.
pub struct Subscription {
    id: ListenerId,
    registry: Weak<dyn Deregister>,
    active: AtomicBool,
}

impl Subscription {
    /// Returns the listener id.
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// Removes the listener. Returns `true` only on the call that removed it.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.deregister(self.id))
    }

    /// Returns `true` until [`Self::unsubscribe`] has run.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
