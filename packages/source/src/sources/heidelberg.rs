//! Stadt Heidelberg off-street parking.
//!
//! The city data platform serves a JSON list of entities in which every
//! field is wrapped in a `{"type": …, "value": …}` envelope. One request
//! carries static and realtime data.

use std::sync::LazyLock;

use async_trait::async_trait;
use parkapi_normalize::envelope::unwrap_value_envelopes;
use parkapi_normalize::opening_hours::parse_time;
use parkapi_normalize::{EnumTable, Normalizer, Unmapped, blank, text};
use parkapi_parking_models::{FieldError, OpeningStatus, RealtimeSite, StaticSite};
use parkapi_scraper::HttpClient;
use parkapi_source_models::{ImportBatch, SourceInfo};
use serde_json::{Map, Value};

use super::{canonical, string_field};
use crate::collect::{RecordInput, RecordOutcome, collect_records};
use crate::{Config, ParkingSource, PullSource, SourceError};

const UID: &str = "heidelberg";
const API_KEY: &str = "PARK_API_HEIDELBERG_API_KEY";
const DEFAULT_URL: &str =
    "https://api.datenplattform.heidelberg.de/ckan/or/mobility/main/offstreetparking/v2/entities";

static STATUS: LazyLock<EnumTable<OpeningStatus>> = LazyLock::new(|| {
    EnumTable::new(
        [
            ("Open", OpeningStatus::Open),
            ("Offen", OpeningStatus::Open),
            ("Closed", OpeningStatus::Closed),
            ("Geschlossen", OpeningStatus::Closed),
            ("Stoerung", OpeningStatus::Closed),
            ("0", OpeningStatus::Unknown),
        ],
        Unmapped::Fallback(OpeningStatus::Unknown),
    )
});

/// Stadt Heidelberg pull source.
pub struct HeidelbergSource {
    info: SourceInfo,
    config: Config,
    client: HttpClient,
    url: String,
}

impl HeidelbergSource {
    #[must_use]
    pub fn new(config: Config, client: HttpClient) -> Self {
        let url = config.endpoint(UID, DEFAULT_URL);
        Self {
            info: SourceInfo::new(UID, "Stadt Heidelberg", true)
                .with_public_url("https://parken.heidelberg.de")
                .with_source_url(DEFAULT_URL)
                .with_attribution_contributor("Stadt Heidelberg"),
            config,
            client,
            url,
        }
    }

    async fn fetch_records(&self) -> Result<Vec<Value>, SourceError> {
        let key = self.config.require(UID, API_KEY)?;
        let data = self
            .client
            .get_json(
                &self.url,
                &[("api-key", key), ("limit", "50")],
                &[("X-Gravitee-Api-Key", key)],
            )
            .await?;
        match data {
            Value::Array(items) => Ok(items),
            _ => Err(SourceError::import(UID, "expected a list of parking sites")),
        }
    }
}

/// Strips the value envelopes of one entity.
fn entity_record(item: Value) -> Option<Map<String, Value>> {
    match item {
        Value::Object(mut record) => {
            unwrap_value_envelopes(&mut record);
            Some(record)
        }
        _ => None,
    }
}

fn non_null<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    record.get(key).filter(|v| !v.is_null())
}

fn centimeters(value: Option<&Value>) -> Result<Value, FieldError> {
    let value = value.cloned().map_or(Value::Null, blank::excel_blank);
    Normalizer::Scale { factor: 100.0 }.apply(value)
}

fn opening_hours(record: &Map<String, Value>) -> Result<Option<String>, FieldError> {
    let (Some(open), Some(close)) = (non_null(record, "openingHours"), non_null(record, "closingHours"))
    else {
        return Ok(None);
    };
    let (open, close) = (parse_time(open)?, parse_time(close)?);
    if open == close {
        return Ok(Some("24/7".to_string()));
    }
    Ok(Some(format!("{}-{}", open.format("%H:%M"), close.format("%H:%M"))))
}

fn has_facility(record: &Map<String, Value>, facility: &str) -> bool {
    record
        .get("facilities")
        .and_then(Value::as_array)
        .is_some_and(|items| items.iter().any(|item| item.as_str() == Some(facility)))
}

fn static_input(record: &Map<String, Value>) -> RecordInput {
    let mut input = RecordInput::new();
    for (field, key) in [
        ("uid", "staticParkingSiteId"),
        ("name", "staticName"),
        ("lat", "lat"),
        ("lon", "lon"),
        ("operator_name", "provider"),
        ("capacity", "totalSpotNumber"),
        ("capacity_disabled", "handicappedParkingSpots"),
        ("capacity_woman", "womenParkingSpots"),
        ("capacity_family", "familyParkingSpots"),
        ("public_url", "website"),
        ("static_data_updated_at", "observationDateTime"),
    ] {
        input.set_opt(field, non_null(record, key).cloned().map(blank::excel_blank));
    }

    input.set_opt(
        "description",
        string_field(record, "description").map(|s| {
            text::replace_all(
                &s,
                &[
                    ("\r".to_string(), String::new()),
                    ("\n".to_string(), " ".to_string()),
                    ("\u{a0}".to_string(), " ".to_string()),
                ],
            )
        }),
    );
    if let (Some(street), Some(locality)) = (
        string_field(record, "streetAddress"),
        string_field(record, "addressLocality"),
    ) {
        let postcode = non_null(record, "postalCode")
            .and_then(|v| text::number_to_string(v).ok())
            .unwrap_or_default();
        input.set("address", format!("{street}, {postcode} {locality}").replace("  ", " "));
    }
    input.set_opt(
        "photo_url",
        record
            .get("images")
            .and_then(Value::as_array)
            .and_then(|images| images.first())
            .cloned(),
    );
    input.try_set("max_height", centimeters(record.get("maximumAllowedHeight")));
    input.try_set("max_width", centimeters(record.get("maximumAllowedWidth")));
    match opening_hours(record) {
        Ok(hours) => {
            input.set_opt("opening_hours", hours);
        }
        Err(e) => {
            input.violate(e.at("opening_hours"));
        }
    }

    let subtype = string_field(record, "parking_type");
    let site_type = match (subtype.as_deref(), string_field(record, "type").as_deref()) {
        (Some("Parking Garage"), _) => Some("CAR_PARK"),
        (_, Some("OffStreetParking")) => Some("OFF_STREET_PARKING_GROUND"),
        _ => None,
    };
    input.set_opt("type", site_type);
    if subtype.as_deref() == Some("Park and Ride Car Park") {
        input.set("park_and_ride_type", Value::from(vec!["YES"]));
    }
    let supervision = if has_facility(record, "Staff") {
        Some("ATTENDED")
    } else if has_facility(record, "Security Camera") {
        Some("VIDEO")
    } else {
        None
    };
    input.set_opt("supervision_type", supervision);
    input.set(
        "has_realtime_data",
        non_null(record, "availableSpotNumber").is_some(),
    );
    input
}

fn realtime_input(record: &Map<String, Value>) -> RecordInput {
    let mut input = RecordInput::new();
    for (field, key) in [
        ("uid", "staticParkingSiteId"),
        ("realtime_capacity", "totalSpotNumber"),
        ("realtime_capacity_disabled", "handicappedParkingSpots"),
        ("realtime_capacity_woman", "womenParkingSpots"),
        ("realtime_capacity_family", "familyParkingSpots"),
        ("realtime_free_capacity", "availableSpotNumber"),
        ("realtime_data_updated_at", "observationDateTime"),
    ] {
        input.set_opt(field, non_null(record, key).cloned());
    }
    if let Some(status) = non_null(record, "status") {
        input.try_set(
            "realtime_opening_status",
            STATUS.map_value(status).map(canonical),
        );
    }
    input
}

fn not_an_object<T>() -> RecordOutcome<T> {
    RecordOutcome::extraction_failure(UID, None, "parking site is not an object")
}

impl ParkingSource for HeidelbergSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn required_config_keys(&self) -> &[&'static str] {
        &[API_KEY]
    }
}

#[async_trait]
impl PullSource for HeidelbergSource {
    async fn get_static_sites(&self) -> Result<ImportBatch<StaticSite>, SourceError> {
        let items = self.fetch_records().await?;
        Ok(collect_records(UID, items, |item| match entity_record(item) {
            Some(record) => static_input(&record).into_static(UID),
            None => not_an_object(),
        }))
    }

    async fn get_realtime_sites(&self) -> Result<ImportBatch<RealtimeSite>, SourceError> {
        let items = self.fetch_records().await?;
        Ok(collect_records(UID, items, |item| match entity_record(item) {
            Some(record) if non_null(&record, "availableSpotNumber").is_none() => {
                RecordOutcome::Skip
            }
            Some(record) => realtime_input(&record).into_realtime(UID),
            None => not_an_object(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use parkapi_parking_models::{ParkAndRideType, ParkingSiteType, ReasonCode, SupervisionType};
    use serde_json::json;

    use super::*;

    fn entity() -> Map<String, Value> {
        let mut record = json!({
            "staticParkingSiteId": {"type": "Text", "value": "P12"},
            "staticName": {"type": "Text", "value": "P12 Bismarckplatz"},
            "type": "OffStreetParking",
            "parking_type": {"type": "Text", "value": "Park and Ride Car Park"},
            "lat": {"type": "Number", "value": 49.4094},
            "lon": {"type": "Number", "value": 8.6935},
            "streetAddress": {"type": "Text", "value": "Sofienstr. 7"},
            "postalCode": {"type": "Number", "value": 69115},
            "addressLocality": {"type": "Text", "value": "Heidelberg"},
            "description": {"type": "Text", "value": "Zufahrt\r\nüber die Sofienstraße"},
            "provider": {"type": "Text", "value": "Heidelberger Services"},
            "maximumAllowedHeight": {"type": "Number", "value": 2.1},
            "maximumAllowedWidth": {"type": "Text", "value": ""},
            "images": {"type": "List", "value": ["https://parken.heidelberg.de/p12.jpg"]},
            "facilities": {"type": "List", "value": ["Elevator", "Security Camera"]},
            "openingHours": {"type": "Text", "value": "00:00"},
            "closingHours": {"type": "Text", "value": "00:00"},
            "totalSpotNumber": {"type": "Number", "value": 120},
            "handicappedParkingSpots": {"type": "Number", "value": 4},
            "womenParkingSpots": {"type": "Number", "value": 6},
            "familyParkingSpots": {"type": "Number", "value": 2},
            "availableSpotNumber": {"type": "Number", "value": 37},
            "status": {"type": "Text", "value": "Stoerung"},
            "observationDateTime": {"type": "DateTime", "value": "2024-04-01T12:00:00+02:00"}
        });
        let record = record.as_object_mut().unwrap();
        unwrap_value_envelopes(record);
        record.clone()
    }

    #[test]
    fn static_fields_from_unwrapped_entity() {
        let RecordOutcome::Emit(site) = static_input(&entity()).into_static(UID) else {
            panic!("expected a site");
        };
        assert_eq!(site.uid, "P12");
        assert_eq!(site.address.as_deref(), Some("Sofienstr. 7, 69115 Heidelberg"));
        assert_eq!(site.description.as_deref(), Some("Zufahrt über die Sofienstraße"));
        assert_eq!(site.site_type, Some(ParkingSiteType::OffStreetParkingGround));
        assert_eq!(site.park_and_ride_type, Some(vec![ParkAndRideType::Yes]));
        assert_eq!(site.supervision_type, Some(SupervisionType::Video));
        assert_eq!(site.max_height, Some(210));
        assert_eq!(site.max_width, None);
        assert_eq!(site.opening_hours.as_deref(), Some("24/7"));
        assert!(site.has_realtime_data);
        assert_eq!(site.static_data_updated_at.to_rfc3339(), "2024-04-01T10:00:00+00:00");
    }

    #[test]
    fn realtime_status_table() {
        let RecordOutcome::Emit(site) = realtime_input(&entity()).into_realtime(UID) else {
            panic!("expected a snapshot");
        };
        assert_eq!(site.realtime_opening_status, OpeningStatus::Closed);
        assert_eq!(site.realtime_free_capacity, Some(37));

        let mut record = entity();
        record.insert("status".to_string(), json!("Wartung"));
        let RecordOutcome::Emit(site) = realtime_input(&record).into_realtime(UID) else {
            panic!("expected a snapshot");
        };
        assert_eq!(site.realtime_opening_status, OpeningStatus::Unknown);
    }

    #[test]
    fn garage_and_staff_win() {
        let mut record = entity();
        record.insert("parking_type".to_string(), json!("Parking Garage"));
        record.insert("facilities".to_string(), json!(["Staff", "Security Camera"]));
        record.insert("closingHours".to_string(), json!("23:30"));
        let RecordOutcome::Emit(site) = static_input(&record).into_static(UID) else {
            panic!("expected a site");
        };
        assert_eq!(site.site_type, Some(ParkingSiteType::CarPark));
        assert_eq!(site.park_and_ride_type, None);
        assert_eq!(site.supervision_type, Some(SupervisionType::Attended));
        assert_eq!(site.opening_hours.as_deref(), Some("00:00-23:30"));
    }

    #[test]
    fn bad_opening_hours_are_a_field_violation() {
        let mut record = entity();
        record.insert("openingHours".to_string(), json!("morgens"));
        let RecordOutcome::Fail(error) = static_input(&record).into_static(UID) else {
            panic!("expected a failure");
        };
        assert_eq!(error.record_uid.as_deref(), Some("P12"));
        assert!(error.detail.unwrap().has("opening_hours", ReasonCode::InvalidFormat));
    }
}
