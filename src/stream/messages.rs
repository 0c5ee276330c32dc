//! Messages sent to viewers over the streaming endpoints.

use axum::response::sse::Event;
use serde::Serialize;

use crate::domain::{AggregateState, PhoneSnapshot};

/// One tagged message. Each SSE frame carries exactly one, serialized as
/// a single JSON line with a `type` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Sent once, first, when the stream opens.
    Connected,
    /// Aggregate scan-event state.
    State {
        /// The full aggregate.
        data: AggregateState,
    },
    /// Every live phone record.
    Phones(PhoneSnapshot),
    /// Keepalive, sent on every tick of the keepalive interval.
    Ping,
}

impl StreamMessage {
    /// Returns the `type` tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::State { .. } => "state",
            Self::Phones(_) => "phones",
            Self::Ping => "ping",
        }
    }

    /// Encodes the message as an SSE frame.
    ///
    /// # Errors
    ///
    /// Returns an [`axum::Error`] if JSON serialization fails.
    pub fn to_sse_event(&self) -> Result<Event, axum::Error> {
        Event::default().json_data(self)
    }
}
