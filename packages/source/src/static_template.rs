//! Static templates: hand-curated site metadata per source.
//!
//! Sources whose upstream only publishes occupancy take their static
//! records from a GeoJSON `FeatureCollection` named `{uid}.geojson`, read
//! from [`STATIC_GEOJSON_BASE_PATH`] when set and fetched from
//! [`STATIC_GEOJSON_BASE_URL`] otherwise. Each feature carries the
//! canonical static fields as properties and a point geometry.

use std::path::Path;

use parkapi_parking_models::{FieldError, ReasonCode, StaticSite};
use parkapi_scraper::HttpClient;
use parkapi_source_models::ImportBatch;
use serde_json::{Map, Value};

use crate::collect::{RecordInput, RecordOutcome, collect_records, now_timestamp};
use crate::config::{Config, STATIC_GEOJSON_BASE_PATH, STATIC_GEOJSON_BASE_URL};
use crate::SourceError;

/// Used when [`STATIC_GEOJSON_BASE_URL`] is not configured.
pub const DEFAULT_BASE_URL: &str =
    "https://raw.githubusercontent.com/ParkenDD/parkapi-static-data/main/sources";

/// Loads and validates the static template of `source_uid`.
///
/// # Errors
///
/// Returns [`SourceError`] if the template cannot be read or fetched, or
/// is not a GeoJSON `FeatureCollection`.
pub async fn load_static_sites(
    source_uid: &str,
    config: &Config,
    client: &HttpClient,
) -> Result<ImportBatch<StaticSite>, SourceError> {
    let document = if let Some(base_path) = config.get(STATIC_GEOJSON_BASE_PATH) {
        let path = Path::new(base_path).join(format!("{source_uid}.geojson"));
        log::debug!("[{source_uid}] reading static template {}", path.display());
        let bytes = tokio::fs::read(&path).await?;
        serde_json::from_slice(&bytes)?
    } else {
        let base_url = config
            .get(STATIC_GEOJSON_BASE_URL)
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        client
            .get_json(&format!("{base_url}/{source_uid}.geojson"), &[], &[])
            .await?
    };
    parse_static_geojson(source_uid, &document)
}

/// Validates a static template document.
///
/// # Errors
///
/// Returns [`SourceError::Import`] if `document` is not a
/// `FeatureCollection` with a `features` list. Invalid features become
/// record errors.
pub fn parse_static_geojson(
    source_uid: &str,
    document: &Value,
) -> Result<ImportBatch<StaticSite>, SourceError> {
    if document.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(SourceError::import(
            source_uid,
            "static template is not a GeoJSON FeatureCollection",
        ));
    }
    let features = document
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::import(source_uid, "static template has no features list"))?;

    Ok(collect_records(source_uid, features, |feature| {
        feature_to_site(source_uid, feature)
    }))
}

fn feature_to_site(source_uid: &str, feature: &Value) -> RecordOutcome<StaticSite> {
    let Some(properties) = feature.get("properties").and_then(Value::as_object) else {
        return RecordOutcome::extraction_failure(source_uid, None, "feature has no properties");
    };

    let mut input = RecordInput::from_map(properties.clone());
    match point_coordinates(feature) {
        Ok((lon, lat)) => {
            input.set("lat", lat).set("lon", lon);
        }
        Err(e) => {
            input.violate(e.clone().at("lat")).violate(e.at("lon"));
        }
    }
    if input.get("static_data_updated_at").is_none() {
        input.set("static_data_updated_at", now_timestamp());
    }
    input.into_static(source_uid)
}

/// `(lon, lat)` of a point feature.
fn point_coordinates(feature: &Value) -> Result<(f64, f64), FieldError> {
    let geometry: &Map<String, Value> = feature
        .get("geometry")
        .and_then(Value::as_object)
        .ok_or_else(FieldError::required)?;
    if geometry.get("type").and_then(Value::as_str) != Some("Point") {
        return Err(FieldError::new(ReasonCode::InvalidFormat, "geometry is not a Point"));
    }
    match geometry.get("coordinates").and_then(Value::as_array).map(Vec::as_slice) {
        Some([lon, lat]) => lon
            .as_f64()
            .zip(lat.as_f64())
            .ok_or_else(|| FieldError::new(ReasonCode::InvalidType, "coordinates are not numbers")),
        _ => Err(FieldError::new(
            ReasonCode::InvalidFormat,
            "coordinates are not a [lon, lat] pair",
        )),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn template() -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [9.9876, 48.3984]},
                    "properties": {
                        "uid": "deutschhaus",
                        "name": "Parkhaus Deutschhaus",
                        "type": "CAR_PARK",
                        "address": "Friedrich-Ebert-Str. 8, 89073 Ulm",
                        "capacity": 594,
                        "has_realtime_data": true
                    }
                },
                {
                    "type": "Feature",
                    "geometry": {"type": "LineString", "coordinates": [[9.9, 48.3], [9.8, 48.4]]},
                    "properties": {"uid": "broken", "name": "Broken", "has_realtime_data": true}
                },
                {"type": "Feature"}
            ]
        })
    }

    #[test]
    fn features_become_static_sites() {
        let batch = parse_static_geojson("ulm", &template()).unwrap();
        assert_eq!(batch.items.len(), 1);
        let site = &batch.items[0];
        assert_eq!(site.uid, "deutschhaus");
        assert_eq!(site.capacity, Some(594));
        assert!(site.has_realtime_data);
        assert!((site.lat - 48.3984).abs() < 1e-9);

        assert_eq!(batch.errors.len(), 2);
        assert_eq!(batch.errors[0].record_uid.as_deref(), Some("broken"));
        assert_eq!(batch.errors[1].record_uid, None);
    }

    #[test]
    fn rejects_other_documents() {
        assert!(matches!(
            parse_static_geojson("ulm", &json!({"type": "Feature"})),
            Err(SourceError::Import { .. })
        ));
        assert!(parse_static_geojson("ulm", &json!({"type": "FeatureCollection"})).is_err());
    }

    #[tokio::test]
    async fn loads_from_base_path() {
        let dir = std::env::temp_dir().join(format!("parkapi-template-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("ulm.geojson"), template().to_string())
            .await
            .unwrap();

        let config = Config::new().with(STATIC_GEOJSON_BASE_PATH, &dir.to_string_lossy());
        let client = HttpClient::new().unwrap();
        let batch = load_static_sites("ulm", &config, &client).await.unwrap();
        assert_eq!(batch.items.len(), 1);

        let missing = load_static_sites("mannheim", &config, &client).await;
        assert!(matches!(missing, Err(SourceError::Io(_))));
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
