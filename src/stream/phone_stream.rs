//! Fixed-cadence stream of phone records for one viewer.
//!
//! Phones post every 100 ms, so [`PhoneStream`] does not react to
//! individual updates. It reads [`PhoneStore::snapshot`] on every tick of
//! its poll interval and yields the whole table, with a `ping` on the
//! keepalive interval like the state stream.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::messages::StreamMessage;
use crate::domain::PhoneStore;

/// One viewer's phone stream.
#[derive(Debug)]
pub struct PhoneStream {
    store: Arc<PhoneStore>,
    greeted: bool,
    poll: Option<Interval>,
    keepalive: Option<Interval>,
}

impl PhoneStream {
    /// Builds the stream. The first snapshot follows `connected`
    /// immediately. Must be called within a Tokio runtime.
    #[must_use]
    pub fn open(store: Arc<PhoneStore>, period: Duration, keepalive_period: Duration) -> Self {
        let mut poll = tokio::time::interval(period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let first_ping = Instant::now() + keepalive_period;
        let mut keepalive = tokio::time::interval_at(first_ping, keepalive_period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(period_ms = period.as_millis(), "phone stream opened");
        Self {
            store,
            greeted: false,
            poll: Some(poll),
            keepalive: Some(keepalive),
        }
    }

    /// Stops both timers. The stream ends on its next poll.
    pub fn release(&mut self) {
        self.keepalive = None;
        if self.poll.take().is_some() {
            tracing::debug!("phone stream released");
        }
    }
}

impl Stream for PhoneStream {
    type Item = StreamMessage;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(poll) = this.poll.as_mut() else {
            return Poll::Ready(None);
        };
        if !this.greeted {
            this.greeted = true;
            return Poll::Ready(Some(StreamMessage::Connected));
        }

        if poll.poll_tick(cx).is_ready() {
            return Poll::Ready(Some(StreamMessage::Phones(this.store.snapshot())));
        }
        if let Some(keepalive) = this.keepalive.as_mut()
            && keepalive.poll_tick(cx).is_ready()
        {
            return Poll::Ready(Some(StreamMessage::Ping));
        }
        Poll::Pending
    }
}

impl Drop for PhoneStream {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Clock, DeviceUpdate, ManualClock, PhoneSnapshot, PhoneStoreConfig};
    use futures_util::StreamExt;

    const KEEPALIVE: Duration = Duration::from_secs(30);

    fn make_store() -> Arc<PhoneStore> {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_now());
        Arc::new(PhoneStore::new(PhoneStoreConfig::default(), clock))
    }

    async fn next_phones(stream: &mut PhoneStream) -> PhoneSnapshot {
        match stream.next().await {
            Some(StreamMessage::Phones(snapshot)) => snapshot,
            other => panic!("expected phones, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn connected_then_snapshots_on_cadence() {
        let store = make_store();
        store.upsert("p1", DeviceUpdate::default());
        let mut stream = PhoneStream::open(Arc::clone(&store), Duration::from_millis(250), KEEPALIVE);

        assert_eq!(stream.next().await, Some(StreamMessage::Connected));
        assert_eq!(next_phones(&mut stream).await.phones.len(), 1);

        store.upsert("p2", DeviceUpdate::default());
        let started = tokio::time::Instant::now();
        let snapshot = next_phones(&mut stream).await;
        assert_eq!(snapshot.phones.len(), 2);
        assert!(started.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn pings_on_keepalive_between_snapshots() {
        let store = make_store();
        let stream = PhoneStream::open(store, Duration::from_secs(1), Duration::from_millis(1500));
        let kinds: Vec<&str> = stream.take(5).map(|msg| msg.kind()).collect().await;
        assert_eq!(kinds, ["connected", "phones", "phones", "ping", "phones"]);
    }

    #[tokio::test]
    async fn polling_does_not_subscribe() {
        let store = make_store();
        let _stream = PhoneStream::open(Arc::clone(&store), Duration::from_millis(100), KEEPALIVE);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn released_stream_ends() {
        let store = make_store();
        let mut stream = PhoneStream::open(store, Duration::from_millis(100), KEEPALIVE);
        assert_eq!(stream.next().await, Some(StreamMessage::Connected));
        stream.release();
        assert_eq!(stream.next().await, None);
    }
}
