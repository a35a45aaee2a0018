//! Deutsche Bahn parking facilities (DB BahnPark API v2).
//!
//! Only static data is published: realtime occupancy is rate limited too
//! tightly to poll, so [`PullSource::get_realtime_sites`] returns an empty
//! batch.

use std::sync::LazyLock;

use async_trait::async_trait;
use parkapi_normalize::{EnumTable, Normalizer, Unmapped};
use parkapi_parking_models::{FieldError, ParkingSiteType, RealtimeSite, ReasonCode, StaticSite};
use parkapi_scraper::HttpClient;
use parkapi_source_models::{ImportBatch, SourceInfo};
use serde::Deserialize;
use serde_json::Value;
#[cfg(test)]
use serde_json::json;

use super::canonical;
use crate::collect::{RecordInput, RecordOutcome, collect_records, now_timestamp};
use crate::{Config, ParkingSource, PullSource, SourceError};

const UID: &str = "bahn_v2";
const CLIENT_ID: &str = "PARK_API_BAHN_API_CLIENT_ID";
const CLIENT_SECRET: &str = "PARK_API_BAHN_API_CLIENT_SECRET";
const DEFAULT_BASE_URL: &str =
    "https://apis.deutschebahn.com/db-api-marketplace/apis/parking-information/db-bahnpark/v2";

static SITE_TYPES: LazyLock<EnumTable<ParkingSiteType>> = LazyLock::new(|| {
    EnumTable::new(
        [
            ("Parkplatz", ParkingSiteType::OnStreet),
            ("Straße", ParkingSiteType::OnStreet),
            ("Parkhaus", ParkingSiteType::CarPark),
            ("Parkdeck", ParkingSiteType::CarPark),
            ("Tiefgarage", ParkingSiteType::Underground),
        ],
        Unmapped::Fallback(ParkingSiteType::Other),
    )
});

// ── Upstream shape ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Facility {
    id: Value,
    #[serde(default)]
    name: Vec<FacilityName>,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "type")]
    facility_type: Option<FacilityType>,
    operator: Option<Operator>,
    address: Option<Address>,
    #[serde(default)]
    capacity: Vec<Capacity>,
    access: Option<Access>,
}

#[derive(Debug, Deserialize)]
struct FacilityName {
    name: String,
    context: String,
}

#[derive(Debug, Deserialize)]
struct FacilityType {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Operator {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Address {
    street_and_number: Option<String>,
    zip: Option<String>,
    city: Option<String>,
    location: Option<Location>,
}

#[derive(Debug, Deserialize)]
struct Location {
    longitude: f64,
    latitude: f64,
}

#[derive(Debug, Deserialize)]
struct Capacity {
    #[serde(rename = "type")]
    capacity_type: String,
    total: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Access {
    opening_hours: Option<OpeningHours>,
    restrictions: Option<Restrictions>,
}

#[derive(Debug, Deserialize)]
struct OpeningHours {
    #[serde(default)]
    is24h: bool,
}

#[derive(Debug, Deserialize)]
struct Restrictions {
    clearance: Option<Clearance>,
}

#[derive(Debug, Deserialize)]
struct Clearance {
    height: Option<f64>,
    width: Option<f64>,
}

// ── Source ───────────────────────────────────────────────────────────────

/// Deutsche Bahn pull source.
pub struct BahnV2Source {
    info: SourceInfo,
    config: Config,
    client: HttpClient,
    base_url: String,
}

impl BahnV2Source {
    #[must_use]
    pub fn new(config: Config, client: HttpClient) -> Self {
        let base_url = config.endpoint(UID, DEFAULT_BASE_URL);
        Self {
            info: SourceInfo::new(UID, "Deutsche Bahn Parkplätze", false)
                .with_public_url("https://www.dbbahnpark.de"),
            config,
            client,
            base_url,
        }
    }

    async fn fetch_facilities(&self) -> Result<Vec<Value>, SourceError> {
        let client_id = self.config.require(UID, CLIENT_ID)?;
        let secret = self.config.require(UID, CLIENT_SECRET)?;
        let mut data = self
            .client
            .get_json(
                &format!("{}/parking-facilities", self.base_url),
                &[],
                &[
                    ("DB-Client-Id", client_id),
                    ("DB-Api-Key", secret),
                    ("Accept", "application/vnd.parkinginformation.db-bahnpark.v1+json"),
                ],
            )
            .await?;
        match data.get_mut("_embedded").map(Value::take) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(SourceError::import(UID, "response has no _embedded list")),
        }
    }
}

fn centimeters(meters: Option<f64>) -> Result<Value, FieldError> {
    Normalizer::Scale { factor: 100.0 }.apply(meters.map_or(Value::Null, Value::from))
}

fn static_input(facility: Facility) -> RecordInput {
    let mut input = RecordInput::new();
    input.set("uid", match facility.id {
        Value::Number(n) => Value::String(n.to_string()),
        other => other,
    });
    let name = facility
        .name
        .iter()
        .find(|name| name.context == "NAME")
        .or_else(|| facility.name.first());
    input.set_opt("name", name.map(|name| name.name.clone()));
    input.set_opt("public_url", facility.url);
    input.set_opt(
        "operator_name",
        facility.operator.and_then(|operator| operator.name),
    );
    if let Some(facility_type) = &facility.facility_type {
        input.try_set(
            "type",
            SITE_TYPES.map(&facility_type.name).map(canonical),
        );
    }

    if let Some(address) = facility.address {
        if let (Some(street), Some(zip), Some(city)) =
            (address.street_and_number, address.zip, address.city)
        {
            input.set("address", format!("{street}, {zip} {city}"));
        }
        if let Some(location) = address.location {
            input.set("lat", location.latitude).set("lon", location.longitude);
        }
    }

    let total = |kind: &str| {
        facility
            .capacity
            .iter()
            .find(|capacity| capacity.capacity_type == kind)
            .map(|capacity| capacity.total.clone())
    };
    match total("PARKING") {
        Some(capacity) => {
            input.set("capacity", capacity);
        }
        None => {
            input.violate(
                FieldError::new(ReasonCode::Required, "no PARKING capacity listed").at("capacity"),
            );
        }
    }
    input.set_opt("capacity_disabled", total("HANDICAPPED_PARKING"));

    if let Some(access) = facility.access {
        if access.opening_hours.is_some_and(|hours| hours.is24h) {
            input.set("opening_hours", "24/7");
        }
        let clearance = access.restrictions.and_then(|r| r.clearance);
        input.try_set(
            "max_height",
            centimeters(clearance.as_ref().and_then(|c| c.height)),
        );
        input.try_set(
            "max_width",
            centimeters(clearance.as_ref().and_then(|c| c.width)),
        );
    }

    input
        .set("has_realtime_data", false)
        .set("static_data_updated_at", now_timestamp());
    input
}

fn convert(item: &Value) -> RecordOutcome<StaticSite> {
    let uid = match item.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    };
    match serde_json::from_value::<Facility>(item.clone()) {
        Ok(facility) => static_input(facility).into_static(UID),
        Err(e) => RecordOutcome::extraction_failure(UID, uid, format!("unexpected facility shape: {e}")),
    }
}

impl ParkingSource for BahnV2Source {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn required_config_keys(&self) -> &[&'static str] {
        &[CLIENT_ID, CLIENT_SECRET]
    }
}

#[async_trait]
impl PullSource for BahnV2Source {
    async fn get_static_sites(&self) -> Result<ImportBatch<StaticSite>, SourceError> {
        let items = self.fetch_facilities().await?;
        Ok(collect_records(UID, &items, convert))
    }

    async fn get_realtime_sites(&self) -> Result<ImportBatch<RealtimeSite>, SourceError> {
        Ok(ImportBatch::new())
    }
}

/// A minimal facility as the API returns it; used by tests.
#[cfg(test)]
pub(crate) fn sample_facility(id: u64) -> Value {
    json!({
        "id": id,
        "name": [
            {"name": "Hbf P1", "context": "DISPLAY"},
            {"name": "Stuttgart Hbf P1 Parkhaus", "context": "NAME"}
        ],
        "url": "https://www.dbbahnpark.de/p1",
        "type": {"name": "Parkhaus", "nameEn": "Multi-storey car park", "abbreviation": "PH"},
        "operator": {"name": "Contipark"},
        "address": {
            "streetAndNumber": "Arnulf-Klett-Platz 2",
            "zip": "70173",
            "city": "Stuttgart",
            "location": {"longitude": 9.1816, "latitude": 48.7838}
        },
        "capacity": [
            {"type": "PARKING", "total": "420"},
            {"type": "HANDICAPPED_PARKING", "total": 8}
        ],
        "access": {
            "openingHours": {"is24h": true},
            "restrictions": {"clearance": {"height": 2.0, "width": null}}
        }
    })
}
