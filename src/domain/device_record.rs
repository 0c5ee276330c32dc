//! Latest-known state of a connected phone.
//!
//! A [`DeviceRecord`] is created on the first update for a connection id
//! and then merged with every following [`DeviceUpdate`]. Fields absent
//! from an update keep their previous value; `first_seen` never changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Geolocation reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Accuracy radius in metres.
    pub accuracy: f64,
}

/// Device orientation reading, all angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct Orientation {
    /// Rotation around the z axis, 0–360.
    pub alpha: f64,
    /// Front-to-back tilt, -180–180.
    pub beta: f64,
    /// Left-to-right tilt, -90–90.
    pub gamma: f64,
}

/// Partial device state sent by a phone. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceUpdate {
    /// Display name chosen on the phone.
    pub name: Option<String>,
    /// Selfie as an opaque data URL.
    pub image: Option<String>,
    /// Browser user agent.
    pub user_agent: Option<String>,
    /// Browser platform string.
    pub platform: Option<String>,
    /// Browser language tag.
    pub language: Option<String>,
    /// Screen width in CSS pixels.
    pub screen_width: Option<u32>,
    /// Screen height in CSS pixels.
    pub screen_height: Option<u32>,
    /// Last geolocation reading.
    pub location: Option<Location>,
    /// Last orientation reading.
    pub gyroscope: Option<Orientation>,
    /// Whether the user froze the orientation on the phone.
    pub frozen: Option<bool>,
}

/// Stored state for one connection id.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Connection identifier, stable for the phone's session.
    pub id: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Selfie data URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Browser user agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Browser platform string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Browser language tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Screen width in CSS pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u32>,
    /// Screen height in CSS pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u32>,
    /// Last geolocation reading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Last orientation reading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gyroscope: Option<Orientation>,
    /// Whether the orientation is frozen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frozen: Option<bool>,
    /// Instant of the most recent update (epoch ms).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[schema(value_type = i64)]
    pub last_update: DateTime<Utc>,
    /// Instant of the first update (epoch ms). Never changes.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[schema(value_type = i64)]
    pub first_seen: DateTime<Utc>,
}

impl DeviceRecord {
    /// Creates a record from its first update.
    #[must_use]
    pub fn create(id: String, update: DeviceUpdate, now: DateTime<Utc>) -> Self {
        let mut record = Self {
            id,
            name: None,
            image: None,
            user_agent: None,
            platform: None,
            language: None,
            screen_width: None,
            screen_height: None,
            location: None,
            gyroscope: None,
            frozen: None,
            last_update: now,
            first_seen: now,
        };
        record.merge(update, now);
        record
    }

    /// Applies `update` field by field and refreshes `last_update`.
    ///
    /// `last_update` never moves before `first_seen`, even if the clock
    /// is set backwards.
    pub fn merge(&mut self, update: DeviceUpdate, now: DateTime<Utc>) {
        let DeviceUpdate {
            name,
            image,
            user_agent,
            platform,
            language,
            screen_width,
            screen_height,
            location,
            gyroscope,
            frozen,
        } = update;

        replace_if_some(&mut self.name, name);
        replace_if_some(&mut self.image, image);
        replace_if_some(&mut self.user_agent, user_agent);
        replace_if_some(&mut self.platform, platform);
        replace_if_some(&mut self.language, language);
        replace_if_some(&mut self.screen_width, screen_width);
        replace_if_some(&mut self.screen_height, screen_height);
        replace_if_some(&mut self.location, location);
        replace_if_some(&mut self.gyroscope, gyroscope);
        replace_if_some(&mut self.frozen, frozen);

        self.last_update = now.max(self.first_seen);
    }
}

fn replace_if_some<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn gyro(alpha: f64) -> DeviceUpdate {
        DeviceUpdate {
            gyroscope: Some(Orientation {
                alpha,
                beta: 5.0,
                gamma: 0.0,
            }),
            ..DeviceUpdate::default()
        }
    }

    #[test]
    fn create_sets_both_timestamps() {
        let now = Utc::now();
        let record = DeviceRecord::create("p1".to_string(), gyro(10.0), now);
        assert_eq!(record.first_seen, now);
        assert_eq!(record.last_update, now);
        assert_eq!(record.gyroscope.map(|g| g.alpha), Some(10.0));
    }

    #[test]
    fn merge_keeps_absent_fields() {
        let now = Utc::now();
        let mut record = DeviceRecord::create(
            "p1".to_string(),
            DeviceUpdate {
                name: Some("Ana".to_string()),
                ..gyro(10.0)
            },
            now,
        );

        record.merge(gyro(20.0), now + TimeDelta::milliseconds(100));

        assert_eq!(record.name.as_deref(), Some("Ana"));
        assert_eq!(record.gyroscope.map(|g| g.alpha), Some(20.0));
        assert_eq!(record.first_seen, now);
        assert_eq!(record.last_update, now + TimeDelta::milliseconds(100));
    }

    #[test]
    fn last_update_never_precedes_first_seen() {
        let now = Utc::now();
        let mut record = DeviceRecord::create("p1".to_string(), DeviceUpdate::default(), now);
        record.merge(DeviceUpdate::default(), now - TimeDelta::seconds(5));
        assert_eq!(record.last_update, now);
        assert!(record.first_seen <= record.last_update);
    }

    #[test]
    fn absent_optionals_are_not_serialized() {
        let record = DeviceRecord::create("p1".to_string(), DeviceUpdate::default(), Utc::now());
        let json = serde_json::to_value(&record).unwrap_or_default();
        assert_eq!(json["id"], "p1");
        assert!(json.get("gyroscope").is_none());
        assert!(json.get("lastUpdate").is_some());
        assert!(json.get("firstSeen").is_some());
    }
}
