//! Realtime occupancy snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::OpeningStatus;
use crate::input::InputReader;
use crate::validation::ValidationError;
use crate::value;

/// One occupancy snapshot for a site.
///
/// `uid` is expected to match a [`crate::StaticSite`] of the same source;
/// that pairing happens downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeSite {
    pub uid: String,
    pub realtime_data_updated_at: DateTime<Utc>,
    #[serde(default)]
    pub realtime_opening_status: OpeningStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_capacity_disabled: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_capacity_woman: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_capacity_family: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_capacity_charging: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_capacity_carsharing: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_capacity_truck: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_capacity_bus: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_free_capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_free_capacity_disabled: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_free_capacity_woman: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_free_capacity_family: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_free_capacity_charging: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_free_capacity_carsharing: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_free_capacity_truck: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_free_capacity_bus: Option<u32>,
}

impl RealtimeSite {
    /// Validates an input mapping into a realtime snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every rejected field.
    pub fn validate(input: &Map<String, Value>) -> Result<Self, ValidationError> {
        fn count(r: &mut InputReader<'_>, field: &str) -> Option<u32> {
            r.optional(field, value::non_negative)
        }

        let mut r = InputReader::new(input);

        let uid = r.required("uid", |v| value::string(v, 1, 256));
        let realtime_data_updated_at = r.required("realtime_data_updated_at", value::datetime);
        let realtime_opening_status =
            r.defaulted("realtime_opening_status", OpeningStatus::Unknown, value::enumeration);

        let site = Self {
            realtime_capacity: count(&mut r, "realtime_capacity"),
            realtime_capacity_disabled: count(&mut r, "realtime_capacity_disabled"),
            realtime_capacity_woman: count(&mut r, "realtime_capacity_woman"),
            realtime_capacity_family: count(&mut r, "realtime_capacity_family"),
            realtime_capacity_charging: count(&mut r, "realtime_capacity_charging"),
            realtime_capacity_carsharing: count(&mut r, "realtime_capacity_carsharing"),
            realtime_capacity_truck: count(&mut r, "realtime_capacity_truck"),
            realtime_capacity_bus: count(&mut r, "realtime_capacity_bus"),
            realtime_free_capacity: count(&mut r, "realtime_free_capacity"),
            realtime_free_capacity_disabled: count(&mut r, "realtime_free_capacity_disabled"),
            realtime_free_capacity_woman: count(&mut r, "realtime_free_capacity_woman"),
            realtime_free_capacity_family: count(&mut r, "realtime_free_capacity_family"),
            realtime_free_capacity_charging: count(&mut r, "realtime_free_capacity_charging"),
            realtime_free_capacity_carsharing: count(&mut r, "realtime_free_capacity_carsharing"),
            realtime_free_capacity_truck: count(&mut r, "realtime_free_capacity_truck"),
            realtime_free_capacity_bus: count(&mut r, "realtime_free_capacity_bus"),
            uid,
            realtime_data_updated_at,
            realtime_opening_status,
        };

        r.finish()?;
        Ok(site)
    }

    /// The canonical JSON object of this record.
    #[must_use]
    pub fn to_json_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
