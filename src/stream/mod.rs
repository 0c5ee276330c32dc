//! Streaming layer: one-way viewer streams over Server-Sent Events.
//!
//! [`StateStream`] forwards every [`crate::domain::EventStore`]
//! notification; [`PhoneStream`] samples the
//! [`crate::domain::PhoneStore`] at a fixed cadence. Both open with a
//! `connected` frame, send `ping` keepalives, and release their timers and
//! subscriptions when the viewer's connection is dropped.

pub mod handler;
pub mod messages;
pub mod phone_stream;
pub mod state_stream;

pub use messages::StreamMessage;
pub use phone_stream::PhoneStream;
pub use state_stream::StateStream;
