//! Derived installation statistics.
//!
//! [`AggregateState`] is never edited in place. Every mutation of the
//! event log (and every read) rebuilds it from the live events with
//! [`AggregateState::compute`], so averages cannot drift.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::ScanEvent;

/// Aggregate view of the scan-event log pushed to viewers.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregateState {
    /// Events created within the active window.
    pub active_users: usize,
    /// Distinct language tags across the log.
    pub languages: BTreeSet<String>,
    /// Mean of `hour` across the log, or the current local hour when empty.
    pub average_hour: f64,
    /// Mean of `motion` across events that reported it, `0.0` when none did.
    pub average_motion: f64,
    /// Number of events that reported motion.
    pub motion_count: usize,
    /// Number of events in the log.
    pub event_count: usize,
}

impl AggregateState {
    /// State of an empty log.
    #[must_use]
    pub fn baseline(local_hour: u32) -> Self {
        Self {
            active_users: 0,
            languages: BTreeSet::new(),
            average_hour: f64::from(local_hour),
            average_motion: 0.0,
            motion_count: 0,
            event_count: 0,
        }
    }

    /// Recomputes every field from `events` as seen at `now`.
    ///
    /// An event is active while `now - created_at < active_window`.
    #[must_use]
    pub fn compute(
        events: &[ScanEvent],
        now: DateTime<Utc>,
        active_window: TimeDelta,
        local_hour: u32,
    ) -> Self {
        if events.is_empty() {
            return Self::baseline(local_hour);
        }

        let mut languages = BTreeSet::new();
        let mut hour_sum = 0.0;
        let mut motion_sum = 0.0;
        let mut motion_count = 0usize;
        let mut active_users = 0usize;

        for event in events {
            languages.insert(event.language.clone());
            hour_sum += f64::from(event.hour);
            if let Some(motion) = event.motion {
                motion_sum += motion;
                motion_count += 1;
            }
            if now - event.created_at < active_window {
                active_users += 1;
            }
        }

        let average_motion = if motion_count == 0 {
            0.0
        } else {
            motion_sum / motion_count as f64
        };

        Self {
            active_users,
            languages,
            average_hour: hour_sum / events.len() as f64,
            average_motion,
            motion_count,
            event_count: events.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeviceClass, NewScanEvent};

    fn event(language: &str, hour: u8, motion: Option<f64>, at: DateTime<Utc>) -> ScanEvent {
        ScanEvent::stamp(
            NewScanEvent {
                language: language.to_string(),
                hour,
                device_class: DeviceClass::Mobile,
                motion,
            },
            at,
        )
    }

    #[test]
    fn empty_log_falls_back_to_local_hour() {
        let state = AggregateState::compute(&[], Utc::now(), TimeDelta::minutes(2), 17);
        assert_eq!(state, AggregateState::baseline(17));
        assert!((state.average_hour - 17.0).abs() < 1e-9);
    }

    #[test]
    fn averages_and_languages() {
        let now = Utc::now();
        let events = vec![
            event("en", 10, Some(0.2), now),
            event("es", 14, None, now),
            event("en", 22, Some(0.6), now),
        ];
        let state = AggregateState::compute(&events, now, TimeDelta::minutes(2), 0);

        assert!((state.average_hour - 46.0 / 3.0).abs() < 1e-9);
        assert!((state.average_motion - 0.4).abs() < 1e-9);
        assert_eq!(state.motion_count, 2);
        assert_eq!(state.event_count, 3);
        let langs: Vec<&str> = state.languages.iter().map(String::as_str).collect();
        assert_eq!(langs, ["en", "es"]);
    }

    #[test]
    fn active_window_is_exclusive() {
        let now = Utc::now();
        let window = TimeDelta::seconds(120);
        let events = vec![
            event("en", 1, None, now - TimeDelta::seconds(119)),
            event("en", 1, None, now - TimeDelta::seconds(120)),
            event("en", 1, None, now - TimeDelta::seconds(121)),
        ];
        let state = AggregateState::compute(&events, now, window, 0);
        assert_eq!(state.active_users, 1);
        assert_eq!(state.event_count, 3);
    }

    #[test]
    fn serializes_viewer_fields() {
        let state = AggregateState::baseline(9);
        let json = serde_json::to_value(&state).unwrap_or_default();
        assert_eq!(json["activeUsers"], 0);
        assert_eq!(json["averageHour"], 9.0);
        assert_eq!(json["averageMotion"], 0.0);
        assert!(json["languages"].is_array());
    }
}
