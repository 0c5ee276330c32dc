//! Subscription-driven stream of aggregate state for one viewer.
//!
//! [`StateStream`] subscribes to the [`EventStore`] when opened and yields
//! `connected`, then every state notification, with a `ping` on every
//! tick of the keepalive interval. It lives exactly as long as the
//! viewer's connection: when the HTTP body is dropped (client gone, or a
//! write failed) the stream is dropped and [`StateStream::release`] runs.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, Stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::messages::StreamMessage;
use crate::domain::{AggregateState, EventStore, Subscription};

type Update = (Result<AggregateState, RecvError>, broadcast::Receiver<AggregateState>);

fn next_update(mut rx: broadcast::Receiver<AggregateState>) -> BoxFuture<'static, Update> {
    async move {
        let result = rx.recv().await;
        (result, rx)
    }
    .boxed()
}

/// One viewer's aggregate-state stream.
pub struct StateStream {
    greeted: bool,
    keepalive: Option<Interval>,
    updates: Option<BoxFuture<'static, Update>>,
    subscription: Subscription,
    released: bool,
}

impl StateStream {
    /// Subscribes to `store` and builds the stream.
    ///
    /// `buffer` bounds the snapshots queued for a slow viewer. Past it the
    /// oldest queued snapshots are overwritten, so a viewer that falls
    /// behind skips ahead and still ends on the newest state. Must be
    /// called within a Tokio runtime.
    #[must_use]
    pub fn open(store: &Arc<EventStore>, keepalive_period: Duration, buffer: usize) -> Self {
        let (tx, rx) = broadcast::channel(buffer.max(1));
        let subscription = store.subscribe(Arc::new(tx));

        let first_ping = Instant::now() + keepalive_period;
        let mut keepalive = tokio::time::interval_at(first_ping, keepalive_period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(listener = subscription.id(), "state stream opened");
        Self {
            greeted: false,
            keepalive: Some(keepalive),
            updates: Some(next_update(rx)),
            subscription,
            released: false,
        }
    }

    /// Tears the stream down: stops the keepalive timer, unsubscribes from
    /// the store, then drops the update queue. Runs once; later calls are
    /// no-ops.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.keepalive = None;
        self.subscription.unsubscribe();
        self.updates = None;
        tracing::debug!(listener = self.subscription.id(), "state stream released");
    }

    /// Returns `true` once [`Self::release`] has run.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }
}

impl Stream for StateStream {
    type Item = StreamMessage;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.released {
            return Poll::Ready(None);
        }
        if !this.greeted {
            this.greeted = true;
            return Poll::Ready(Some(StreamMessage::Connected));
        }

        while let Some(pending) = this.updates.as_mut() {
            let Poll::Ready((result, rx)) = pending.poll_unpin(cx) else {
                break;
            };
            this.updates = Some(next_update(rx));
            match result {
                Ok(data) => return Poll::Ready(Some(StreamMessage::State { data })),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(
                        listener = this.subscription.id(),
                        skipped,
                        "viewer lagging, oldest snapshots dropped"
                    );
                }
                Err(RecvError::Closed) => {
                    this.release();
                    return Poll::Ready(None);
                }
            }
        }

        if let Some(keepalive) = this.keepalive.as_mut()
            && keepalive.poll_tick(cx).is_ready()
        {
            return Poll::Ready(Some(StreamMessage::Ping));
        }
        Poll::Pending
    }
}

impl fmt::Debug for StateStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStream")
            .field("greeted", &self.greeted)
            .field("subscription", &self.subscription)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl Drop for StateStream {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Clock, DeviceClass, EventStoreConfig, ManualClock, NewScanEvent};
    use futures_util::StreamExt;
    use tokio_test::{assert_pending, assert_ready_eq};

    fn make_store() -> Arc<EventStore> {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_now());
        Arc::new(EventStore::new(EventStoreConfig::default(), clock))
    }

    fn scan(hour: u8) -> NewScanEvent {
        NewScanEvent {
            language: "en".to_string(),
            hour,
            device_class: DeviceClass::Desktop,
            motion: Some(0.5),
        }
    }

    async fn next_state(stream: &mut StateStream) -> AggregateState {
        match stream.next().await {
            Some(StreamMessage::State { data }) => data,
            other => panic!("expected state, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn connected_then_initial_state_then_updates() {
        let store = make_store();
        store.record(scan(10));
        let mut stream = StateStream::open(&store, Duration::from_secs(30), 8);

        assert_eq!(stream.next().await, Some(StreamMessage::Connected));
        assert_eq!(next_state(&mut stream).await.event_count, 1);

        store.record(scan(12));
        let update = next_state(&mut stream).await;
        assert_eq!(update.event_count, 2);
        assert!((update.average_hour - 11.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn pings_on_keepalive_interval() {
        let store = make_store();
        let stream = StateStream::open(&store, Duration::from_secs(30), 8);
        let mut task = tokio_test::task::spawn(stream);

        assert_ready_eq!(task.poll_next(), Some(StreamMessage::Connected));
        let Poll::Ready(Some(StreamMessage::State { .. })) = task.poll_next() else {
            panic!("initial state must be ready immediately");
        };
        assert_pending!(task.poll_next());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(task.is_woken());
        assert_ready_eq!(task.poll_next(), Some(StreamMessage::Ping));
        assert_pending!(task.poll_next());
    }

    #[tokio::test]
    async fn slow_viewer_ends_on_newest_state() {
        let store = make_store();
        let stream = StateStream::open(&store, Duration::from_secs(30), 2);
        for hour in 0..5 {
            store.record(scan(hour));
        }

        let mut task = tokio_test::task::spawn(stream);
        assert_ready_eq!(task.poll_next(), Some(StreamMessage::Connected));
        let mut counts = Vec::new();
        while let Poll::Ready(Some(StreamMessage::State { data })) = task.poll_next() {
            counts.push(data.event_count);
        }
        assert_eq!(counts, vec![4, 5]);
        assert_pending!(task.poll_next());
    }

    #[tokio::test]
    async fn drop_unsubscribes() {
        let store = make_store();
        let stream = StateStream::open(&store, Duration::from_secs(30), 8);
        assert_eq!(store.subscriber_count(), 1);

        drop(stream);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn release_is_idempotent_and_ends_stream() {
        let store = make_store();
        let mut stream = StateStream::open(&store, Duration::from_secs(30), 8);
        stream.release();
        stream.release();

        assert!(stream.is_released());
        assert_eq!(store.subscriber_count(), 0);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn viewers_are_independent() {
        let store = make_store();
        let mut a = StateStream::open(&store, Duration::from_secs(30), 8);
        let b = StateStream::open(&store, Duration::from_secs(30), 8);
        drop(b);

        store.record(scan(3));
        assert_eq!(a.next().await, Some(StreamMessage::Connected));
        assert_eq!(next_state(&mut a).await.event_count, 0);
        assert_eq!(next_state(&mut a).await.event_count, 1);
        assert_eq!(store.subscriber_count(), 1);
    }
}
