//! Static parking site metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::input::InputReader;
use crate::validation::{FieldError, ReasonCode, ValidationError};
use crate::value;
use crate::{
    ExternalIdentifierType, ParkAndRideType, ParkingSiteType, PurposeType, SupervisionType,
};

/// Latitude bounds of the supported region (Europe).
pub const LAT_RANGE: (f64, f64) = (34.0, 72.0);
/// Longitude bounds of the supported region (Europe).
pub const LON_RANGE: (f64, f64) = (-27.0, 43.0);

const SHORT_TEXT: usize = 256;
const ADDRESS_TEXT: usize = 512;
const OPENING_HOURS_TEXT: usize = 512;
const LONG_TEXT: usize = 4096;

/// A cross-reference into another registry (OSM, DHID).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentifier {
    #[serde(rename = "type")]
    pub identifier_type: ExternalIdentifierType,
    pub value: String,
}

impl ExternalIdentifier {
    fn validate(raw: &Value) -> Result<Self, FieldError> {
        let Some(map) = raw.as_object() else {
            return Err(FieldError::invalid_type("object", raw));
        };
        let identifier_type = map
            .get("type")
            .ok_or_else(FieldError::required)
            .and_then(value::enumeration::<ExternalIdentifierType>)?;
        let value = map
            .get("value")
            .ok_or_else(FieldError::required)
            .and_then(|v| value::string(v, 1, SHORT_TEXT))?;
        Ok(Self {
            identifier_type,
            value,
        })
    }
}

/// One physical parking location.
///
/// Lengths (`max_height`, `max_width`) are centimeters, `max_stay` is
/// seconds. Construct through [`StaticSite::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticSite {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub purpose: PurposeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub site_type: Option<ParkingSiteType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_stay: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_lighting: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_covered: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_fee: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub park_and_ride_type: Option<Vec<ParkAndRideType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervision_type: Option<SupervisionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_location: Option<String>,
    #[serde(default)]
    pub has_realtime_data: bool,
    pub static_data_updated_at: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_disabled: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_woman: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_family: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_charging: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_carsharing: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_truck: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_bus: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_identifiers: Vec<ExternalIdentifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl StaticSite {
    /// Validates an input mapping into a static site.
    ///
    /// Every field is checked before failing. Unknown keys are ignored, so
    /// a mapping carrying realtime fields as well is accepted.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing all field and cross-field
    /// violations.
    pub fn validate(input: &Map<String, Value>) -> Result<Self, ValidationError> {
        let mut r = InputReader::new(input);

        let uid = r.required("uid", |v| value::string(v, 1, SHORT_TEXT));
        let name = r.required("name", |v| value::string(v, 1, SHORT_TEXT));
        let purpose = r.defaulted("purpose", PurposeType::Car, value::enumeration);
        let operator_name = r.optional("operator_name", |v| value::string(v, 0, SHORT_TEXT));
        let public_url = r.optional("public_url", |v| value::url(v, LONG_TEXT));
        let address = r.optional("address", |v| value::string(v, 0, ADDRESS_TEXT));
        let description = r.optional("description", |v| value::string(v, 0, LONG_TEXT));
        let site_type: Option<ParkingSiteType> = r.optional("type", value::enumeration);
        let max_stay = r.optional("max_stay", value::non_negative);
        let max_height = r.optional("max_height", value::non_negative);
        let max_width = r.optional("max_width", value::non_negative);
        let has_lighting = r.optional("has_lighting", value::boolean);
        let is_covered = r.optional("is_covered", value::boolean);
        let has_fee = r.optional("has_fee", value::boolean);
        let fee_description = r.optional("fee_description", |v| value::string(v, 0, LONG_TEXT));
        let park_and_ride_type: Option<Vec<ParkAndRideType>> =
            r.optional("park_and_ride_type", |v| value::list(v, value::enumeration));
        let supervision_type: Option<SupervisionType> =
            r.optional("supervision_type", value::enumeration);
        let photo_url = r.optional("photo_url", |v| value::url(v, LONG_TEXT));
        let related_location =
            r.optional("related_location", |v| value::string(v, 0, SHORT_TEXT));
        let has_realtime_data = r.defaulted("has_realtime_data", false, value::boolean);
        let static_data_updated_at = r.required("static_data_updated_at", value::datetime);
        let lat = r.required("lat", |v| value::number(v, LAT_RANGE.0, LAT_RANGE.1));
        let lon = r.required("lon", |v| value::number(v, LON_RANGE.0, LON_RANGE.1));
        let capacity = r.optional("capacity", value::non_negative);
        let capacity_disabled = r.optional("capacity_disabled", value::non_negative);
        let capacity_woman = r.optional("capacity_woman", value::non_negative);
        let capacity_family = r.optional("capacity_family", value::non_negative);
        let capacity_charging = r.optional("capacity_charging", value::non_negative);
        let capacity_carsharing = r.optional("capacity_carsharing", value::non_negative);
        let capacity_truck = r.optional("capacity_truck", value::non_negative);
        let capacity_bus = r.optional("capacity_bus", value::non_negative);
        let opening_hours =
            r.optional("opening_hours", |v| value::string(v, 0, OPENING_HOURS_TEXT));
        let external_identifiers = r
            .optional("external_identifiers", |v| {
                value::list(v, ExternalIdentifier::validate)
            })
            .unwrap_or_default();
        let tags = r
            .optional("tags", |v| value::list(v, |t| value::string(t, 1, SHORT_TEXT)))
            .unwrap_or_default();

        // Range checks already reject (0, 0); it gets its own code because
        // upstreams use it as a "missing" sentinel.
        let raw_lat = r.raw("lat").and_then(value::as_number);
        let raw_lon = r.raw("lon").and_then(value::as_number);
        if raw_lat == Some(0.0) && raw_lon == Some(0.0) {
            r.violate(
                FieldError::new(ReasonCode::LatLonZero, "lat and lon are both zero").on_record(),
            );
        }

        if let Some(tags) = &park_and_ride_type
            && tags.len() > 1
            && tags.iter().any(|t| t.is_absolute())
        {
            r.violate(
                FieldError::new(
                    ReasonCode::InvalidParkAndRideCombination,
                    "YES and NO cannot be combined with other park and ride types",
                )
                .at("park_and_ride_type"),
            );
        }

        r.finish()?;

        Ok(Self {
            uid,
            name,
            purpose,
            operator_name,
            public_url,
            address,
            description,
            site_type,
            max_stay,
            max_height,
            max_width,
            has_lighting,
            is_covered,
            has_fee,
            fee_description,
            park_and_ride_type,
            supervision_type,
            photo_url,
            related_location,
            has_realtime_data,
            static_data_updated_at,
            lat,
            lon,
            capacity,
            capacity_disabled,
            capacity_woman,
            capacity_family,
            capacity_charging,
            capacity_carsharing,
            capacity_truck,
            capacity_bus,
            opening_hours,
            external_identifiers,
            tags,
        })
    }

    /// Whether the site has any form of supervision.
    #[must_use]
    pub const fn is_supervised(&self) -> Option<bool> {
        match self.supervision_type {
            Some(SupervisionType::No) => Some(false),
            Some(_) => Some(true),
            None => None,
        }
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

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn valid_input() -> Value {
        json!({
            "uid": "p1",
            "name": "Parkhaus Mitte",
            "type": "CAR_PARK",
            "lat": "48.4914",
            "lon": 9.2043,
            "capacity": "250",
            "capacity_disabled": 4,
            "has_fee": true,
            "max_height": 210,
            "park_and_ride_type": ["TRAIN", "BUS"],
            "external_identifiers": [{"type": "OSM", "value": "way/123"}],
            "public_url": "https://example.org/p1",
            "static_data_updated_at": "2024-04-01T12:13:14.999Z",
        })
    }

    fn validate(value: &Value) -> Result<StaticSite, ValidationError> {
        StaticSite::validate(value.as_object().unwrap())
    }

    #[test]
    fn validates_complete_record() {
        let site = validate(&valid_input()).unwrap();
        assert_eq!(site.uid, "p1");
        assert_eq!(site.site_type, Some(ParkingSiteType::CarPark));
        assert_eq!(site.purpose, PurposeType::Car);
        assert_eq!(site.capacity, Some(250));
        assert!((site.lat - 48.4914).abs() < f64::EPSILON);
        assert_eq!(
            site.static_data_updated_at.to_rfc3339(),
            "2024-04-01T12:13:14+00:00"
        );
        assert!(!site.has_realtime_data);
        assert!(site.tags.is_empty());
    }

    #[test]
    fn reports_every_violation_at_once() {
        let error = validate(&json!({
            "name": "",
            "lat": 12.0,
            "lon": 50.0,
            "capacity": -3,
            "type": "GARAGE",
        }))
        .unwrap_err();

        assert!(error.has("uid", ReasonCode::Required));
        assert!(error.has("name", ReasonCode::TooShort));
        assert!(error.has("lat", ReasonCode::BelowMinimum));
        assert!(error.has("lon", ReasonCode::AboveMaximum));
        assert!(error.has("capacity", ReasonCode::BelowMinimum));
        assert!(error.has("type", ReasonCode::NotAllowedValue));
        assert!(error.has("static_data_updated_at", ReasonCode::Required));
        assert_eq!(error.violations.len(), 7);
    }

    #[test]
    fn rejects_zero_coordinates() {
        let mut input = valid_input();
        input["lat"] = json!(0);
        input["lon"] = json!(0.0);
        let error = validate(&input).unwrap_err();
        assert!(error.has_code(ReasonCode::LatLonZero));
    }

    #[test]
    fn rejects_absolute_park_and_ride_combined() {
        let mut input = valid_input();
        input["park_and_ride_type"] = json!(["YES", "CARPOOL"]);
        let error = validate(&input).unwrap_err();
        assert!(error.has(
            "park_and_ride_type",
            ReasonCode::InvalidParkAndRideCombination
        ));

        input["park_and_ride_type"] = json!(["NO"]);
        assert!(validate(&input).is_ok());
    }

    #[test]
    fn json_round_trip_reproduces_record() {
        let site = validate(&valid_input()).unwrap();
        let encoded = serde_json::to_value(&site).unwrap();
        assert_eq!(encoded["type"], json!("CAR_PARK"));
        assert!(encoded.get("operator_name").is_none());

        let decoded = validate(&encoded).unwrap();
        assert_eq!(decoded, site);
    }

    #[test]
    fn emitted_sites_stay_inside_bounding_box() {
        for (lat, lon) in [(33.9, 9.0), (72.1, 9.0), (48.0, -27.5), (48.0, 43.01)] {
            let mut input = valid_input();
            input["lat"] = json!(lat);
            input["lon"] = json!(lon);
            assert!(validate(&input).is_err(), "({lat}, {lon}) accepted");
        }
        for (lat, lon) in [(34.0, -27.0), (72.0, 43.0)] {
            let mut input = valid_input();
            input["lat"] = json!(lat);
            input["lon"] = json!(lon);
            let site = validate(&input).unwrap();
            assert!((LAT_RANGE.0..=LAT_RANGE.1).contains(&site.lat));
            assert!((LON_RANGE.0..=LON_RANGE.1).contains(&site.lon));
        }
    }

    #[test]
    fn supervision_flag_follows_type() {
        let mut input = valid_input();
        input["supervision_type"] = json!("VIDEO");
        assert_eq!(validate(&input).unwrap().is_supervised(), Some(true));
        input["supervision_type"] = json!("NO");
        assert_eq!(validate(&input).unwrap().is_supervised(), Some(false));
    }
}
