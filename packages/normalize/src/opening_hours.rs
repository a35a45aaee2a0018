//! OSM `opening_hours` strings assembled from spreadsheet columns.

use chrono::NaiveTime;
use parkapi_parking_models::{FieldError, ReasonCode};
use serde_json::Value;

/// Weekly opening times as spreadsheets usually declare them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeeklyHours {
    pub always_open: bool,
    pub weekday: Option<(NaiveTime, NaiveTime)>,
    pub saturday: Option<(NaiveTime, NaiveTime)>,
    pub sunday: Option<(NaiveTime, NaiveTime)>,
    pub public_holiday: Option<(NaiveTime, NaiveTime)>,
}

impl WeeklyHours {
    /// The OSM representation, or `None` if nothing is declared.
    #[must_use]
    pub fn to_osm(&self) -> Option<String> {
        if self.always_open {
            return Some("24/7".to_string());
        }
        let fragments: Vec<String> = [
            ("Mo-Fr", self.weekday),
            ("Sa", self.saturday),
            ("Su", self.sunday),
            ("PH", self.public_holiday),
        ]
        .into_iter()
        .filter_map(|(days, span)| {
            span.map(|(begin, end)| {
                format!("{days} {}-{}", begin.format("%H:%M"), end.format("%H:%M"))
            })
        })
        .collect();

        if fragments.is_empty() {
            None
        } else {
            Some(fragments.join("; "))
        }
    }
}

/// Parses a time-of-day cell (`"08:00"`, `"08:00:00"`).
///
/// # Errors
///
/// Fails on anything else.
pub fn parse_time(value: &Value) -> Result<NaiveTime, FieldError> {
    let Some(s) = value.as_str() else {
        return Err(FieldError::invalid_type("time string", value));
    };
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| {
            FieldError::new(ReasonCode::InvalidFormat, "not a time of day").with_received(value)
        })
}
