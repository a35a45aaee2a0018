//! Stadt Karlsruhe car parks.
//!
//! A WFS endpoint returns a GeoJSON `FeatureCollection` whose point
//! coordinates are UTM zone 32N in `[northing, easting]` order. Static and
//! realtime data come from the same document.

use std::sync::LazyLock;

use async_trait::async_trait;
use parkapi_normalize::{EnumTable, Normalizer, Unmapped, UtmZone, apply_chain, text};
use parkapi_parking_models::{FieldError, OpeningStatus, RealtimeSite, ReasonCode, StaticSite};
use parkapi_scraper::HttpClient;
use parkapi_source_models::{ImportBatch, SourceInfo};
use serde_json::{Map, Value};

use super::{canonical, string_field};
use crate::collect::{RecordInput, RecordOutcome, collect_records};
use crate::{Config, ParkingSource, PullSource, SourceError};

const UID: &str = "karlsruhe";
const DEFAULT_URL: &str = "https://mobil.trk.de:8443/geoserver/TBA/ows?service=WFS&version=1.0.0&request=GetFeature&typeName=TBA%3Aparkhaeuser&outputFormat=application%2Fjson";

static STATUS: LazyLock<EnumTable<OpeningStatus>> = LazyLock::new(|| {
    EnumTable::new(
        [
            ("Geöffnet", OpeningStatus::Open),
            ("Geschlossen", OpeningStatus::Closed),
        ],
        Unmapped::Fallback(OpeningStatus::Unknown),
    )
});

/// Stadt Karlsruhe pull source.
pub struct KarlsruheSource {
    info: SourceInfo,
    client: HttpClient,
    url: String,
}

impl KarlsruheSource {
    #[must_use]
    pub fn new(config: &Config, client: HttpClient) -> Self {
        Self {
            info: SourceInfo::new(UID, "Stadt Karlsruhe: PKW-Parkplätze", true)
                .with_public_url("https://web1.karlsruhe.de/service/Parken/")
                .with_source_url(DEFAULT_URL)
                .with_attribution(
                    "Creative Commons Namensnennung - 4.0 International (CC-BY 4.0)",
                    Some("Stadt Karlsruhe"),
                )
                .with_attribution_url("http://creativecommons.org/licenses/by/4.0/"),
            client,
            url: config.endpoint(UID, DEFAULT_URL),
        }
    }

    async fn fetch_features(&self) -> Result<Vec<Value>, SourceError> {
        let data = self.client.get_json(&self.url, &[], &[]).await?;
        if data.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err(SourceError::import(UID, "response is not a FeatureCollection"));
        }
        match data.get("features") {
            Some(Value::Array(features)) => Ok(features.clone()),
            _ => Err(SourceError::import(UID, "FeatureCollection has no features")),
        }
    }
}

fn properties(feature: &Value) -> Option<&Map<String, Value>> {
    feature.get("properties").and_then(Value::as_object)
}

/// `(lon, lat)` of a `[northing, easting]` point.
fn position(feature: &Value) -> Result<(f64, f64), FieldError> {
    let coordinates = feature
        .pointer("/geometry/coordinates")
        .and_then(Value::as_array)
        .ok_or_else(FieldError::required)?;
    match coordinates.as_slice() {
        [northing, easting] => {
            let (Some(northing), Some(easting)) = (northing.as_f64(), easting.as_f64()) else {
                return Err(FieldError::new(ReasonCode::InvalidType, "coordinates are not numbers"));
            };
            Ok(UtmZone::ZONE_32N.to_lon_lat(easting, northing))
        }
        _ => Err(FieldError::new(
            ReasonCode::InvalidFormat,
            "coordinates are not a [northing, easting] pair",
        )),
    }
}

fn uid(properties: &Map<String, Value>) -> Result<Value, FieldError> {
    properties
        .get("id")
        .map_or(Ok(Value::Null), |id| text::number_to_string(id).map(Value::String))
}

fn static_input(feature: &Value, properties: &Map<String, Value>) -> RecordInput {
    let mut input = RecordInput::new();
    input.try_set("uid", uid(properties));
    input.set_opt("name", properties.get("ph_name").cloned());
    input.set_opt("public_url", properties.get("parkhaus_internet").cloned());
    input.set_opt("capacity", properties.get("gesamte_parkplaetze").cloned());

    match position(feature) {
        Ok((lon, lat)) => {
            input.set("lat", lat).set("lon", lon);
        }
        Err(e) => {
            input.violate(e.clone().at("lat")).violate(e.at("lon"));
        }
    }

    if let (Some(street), Some(postcode), Some(city)) = (
        string_field(properties, "parkhaus_strasse"),
        string_field(properties, "parkhaus_plz"),
        string_field(properties, "parkhaus_gemeinde"),
    ) {
        input.set("address", format!("{street}, {postcode} {city}"));
    }

    input.try_set(
        "max_height",
        apply_chain(
            &[Normalizer::ZeroAsAbsent, Normalizer::Scale { factor: 100.0 }],
            properties.get("max_durchfahrtshoehe").cloned().unwrap_or(Value::Null),
        ),
    );
    input.try_set(
        "static_data_updated_at",
        Normalizer::ParsedDate {
            format: "%Y-%m-%dZ".to_string(),
        }
        .apply(properties.get("stand_parkhausdaten").cloned().unwrap_or(Value::Null)),
    );
    input.set("has_realtime_data", true);
    input
}

fn realtime_input(properties: &Map<String, Value>) -> RecordInput {
    let mut input = RecordInput::new();
    input.try_set("uid", uid(properties));
    input.set_opt("realtime_capacity", properties.get("gesamte_parkplaetze").cloned());
    input.set_opt("realtime_free_capacity", properties.get("freie_parkplaetze").cloned());
    input.set_opt(
        "realtime_data_updated_at",
        properties.get("stand_freieparkplaetze").cloned(),
    );
    let status = match properties.get("oeffnungsstatus") {
        Some(Value::Null) | None => Ok(OpeningStatus::Unknown),
        Some(status) => STATUS.map_value(status),
    };
    input.try_set("realtime_opening_status", status.map(canonical));
    input
}

fn no_properties<T>() -> RecordOutcome<T> {
    RecordOutcome::extraction_failure(UID, None, "feature has no properties")
}

impl ParkingSource for KarlsruheSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }
}

#[async_trait]
impl PullSource for KarlsruheSource {
    async fn get_static_sites(&self) -> Result<ImportBatch<StaticSite>, SourceError> {
        let features = self.fetch_features().await?;
        Ok(collect_records(UID, &features, |feature| {
            properties(feature).map_or_else(no_properties, |props| {
                static_input(feature, props).into_static(UID)
            })
        }))
    }

    /// Features without a free-capacity timestamp carry no realtime data
    /// and are skipped.
    async fn get_realtime_sites(&self) -> Result<ImportBatch<RealtimeSite>, SourceError> {
        let features = self.fetch_features().await?;
        Ok(collect_records(UID, &features, |feature| {
            match properties(feature) {
                None => no_properties(),
                Some(props) if props.get("stand_freieparkplaetze").is_none_or(Value::is_null) => {
                    RecordOutcome::Skip
                }
                Some(props) => realtime_input(props).into_realtime(UID),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn feature(properties: Value) -> Value {
        json!({
            "type": "Feature",
            "id": "parkhaeuser.1",
            "geometry": {"type": "Point", "coordinates": [5_429_000.0, 456_000.0]},
            "properties": properties
        })
    }

    fn schloss() -> Value {
        feature(json!({
            "id": 12,
            "ph_name": "Schloss",
            "gesamte_parkplaetze": 500,
            "freie_parkplaetze": 120,
            "max_durchfahrtshoehe": 0,
            "stand_freieparkplaetze": "2024-04-01T10:15:00Z",
            "parkhaus_strasse": "Schlossplatz 1",
            "parkhaus_plz": "76131",
            "parkhaus_gemeinde": "Karlsruhe",
            "oeffnungsstatus": "Geöffnet",
            "parkhaus_internet": "https://www.karlsruhe.de/schloss",
            "stand_parkhausdaten": "2024-03-01Z"
        }))
    }

    #[test]
    fn static_site_from_utm_feature() {
        let feature = schloss();
        let RecordOutcome::Emit(site) =
            static_input(&feature, properties(&feature).unwrap()).into_static(UID)
        else {
            panic!("expected a site");
        };
        assert_eq!(site.uid, "12");
        assert_eq!(site.address.as_deref(), Some("Schlossplatz 1, 76131 Karlsruhe"));
        assert_eq!(site.max_height, None);
        assert!((site.lat - 49.0).abs() < 0.1);
        assert!((site.lon - 8.4).abs() < 0.1);
        assert_eq!(site.static_data_updated_at.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn realtime_snapshot_and_status() {
        let feature = schloss();
        let RecordOutcome::Emit(site) = realtime_input(properties(&feature).unwrap()).into_realtime(UID)
        else {
            panic!("expected a snapshot");
        };
        assert_eq!(site.uid, "12");
        assert_eq!(site.realtime_free_capacity, Some(120));
        assert_eq!(site.realtime_opening_status, OpeningStatus::Open);
    }

    #[test]
    fn height_in_meters_and_bad_coordinates() {
        let mut feature = schloss();
        feature["properties"]["max_durchfahrtshoehe"] = json!(2.05);
        feature["geometry"]["coordinates"] = json!([5_429_000.0]);
        let RecordOutcome::Fail(error) =
            static_input(&feature, properties(&feature).unwrap()).into_static(UID)
        else {
            panic!("expected a failure");
        };
        let detail = error.detail.unwrap();
        assert!(detail.has("lat", ReasonCode::InvalidFormat));
        assert!(detail.has("lon", ReasonCode::InvalidFormat));
        assert!(!detail.fields().any(|field| field == "max_height"));
    }
}
