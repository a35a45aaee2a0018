//! Kienzler bike and item lockers.
//!
//! A single JSON-RPC style POST with account credentials and the list of
//! unit ids returns capacity and bookable boxes per unit.

use async_trait::async_trait;
use parkapi_parking_models::{ParkingSiteType, PurposeType, RealtimeSite, StaticSite};
use parkapi_scraper::HttpClient;
use parkapi_source_models::{ImportBatch, SourceInfo};
use serde_json::{Map, Value, json};

use super::canonical;
use crate::collect::{RecordInput, RecordOutcome, collect_records, now_timestamp};
use crate::{Config, ParkingSource, PullSource, SourceError};

const UID: &str = "kienzler";
const USER: &str = "PARK_API_KIENZLER_USER";
const PASSWORD: &str = "PARK_API_KIENZLER_PASSWORD";
const IDS: &str = "PARK_API_KIENZLER_IDS";
const DEFAULT_URL: &str = "https://www.bikeandridebox.de/index.php?eID=JSONAPI";

/// Kienzler pull source.
pub struct KienzlerSource {
    info: SourceInfo,
    config: Config,
    client: HttpClient,
    url: String,
}

impl KienzlerSource {
    #[must_use]
    pub fn new(config: Config, client: HttpClient) -> Self {
        let url = config.endpoint(UID, DEFAULT_URL);
        Self {
            info: SourceInfo::new(UID, "Kienzler", true)
                .with_public_url("https://www.bikeandridebox.de"),
            config,
            client,
            url,
        }
    }

    fn request_body(&self) -> Result<Value, SourceError> {
        let ids: Vec<&str> = self
            .config
            .require(UID, IDS)?
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .collect();
        Ok(json!({
            "user": self.config.require(UID, USER)?,
            "password": self.config.require(UID, PASSWORD)?,
            "action": "capacity",
            "context": "unit",
            "ids": ids,
        }))
    }

    async fn fetch_units(&self) -> Result<Vec<Value>, SourceError> {
        let body = self.request_body()?;
        match self.client.post_json(&self.url, &body).await? {
            Value::Array(units) => Ok(units),
            _ => Err(SourceError::import(UID, "expected a list of units")),
        }
    }
}

fn purpose(name: Option<&str>) -> PurposeType {
    if name.is_some_and(|name| name.contains("Schließfächer")) {
        PurposeType::Item
    } else {
        PurposeType::Bike
    }
}

fn static_input(unit: &Map<String, Value>) -> RecordInput {
    let mut input = RecordInput::new();
    input
        .set_opt("uid", unit.get("id").cloned())
        .set_opt("name", unit.get("name").cloned())
        .set_opt("lat", unit.get("lat").cloned())
        .set_opt("lon", unit.get("long").cloned())
        .set_opt("capacity", unit.get("sum_boxes").cloned())
        .set("purpose", canonical(purpose(unit.get("name").and_then(Value::as_str))))
        .set("type", canonical(ParkingSiteType::Lockers))
        .set("has_realtime_data", true)
        .set("static_data_updated_at", now_timestamp());
    input
}

fn realtime_input(unit: &Map<String, Value>) -> RecordInput {
    let mut input = RecordInput::new();
    input
        .set_opt("uid", unit.get("id").cloned())
        .set_opt("realtime_capacity", unit.get("sum_boxes").cloned())
        .set_opt("realtime_free_capacity", unit.get("bookable").cloned())
        .set("realtime_data_updated_at", now_timestamp());
    input
}

fn convert<T>(unit: &Value, build: impl FnOnce(&Map<String, Value>) -> RecordOutcome<T>) -> RecordOutcome<T> {
    unit.as_object().map_or_else(
        || RecordOutcome::extraction_failure(UID, None, "unit is not an object"),
        build,
    )
}

impl ParkingSource for KienzlerSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn required_config_keys(&self) -> &[&'static str] {
        &[USER, PASSWORD, IDS]
    }
}

#[async_trait]
impl PullSource for KienzlerSource {
    async fn get_static_sites(&self) -> Result<ImportBatch<StaticSite>, SourceError> {
        let units = self.fetch_units().await?;
        Ok(collect_records(UID, &units, |unit| {
            convert(unit, |unit| static_input(unit).into_static(UID))
        }))
    }

    async fn get_realtime_sites(&self) -> Result<ImportBatch<RealtimeSite>, SourceError> {
        let units = self.fetch_units().await?;
        Ok(collect_records(UID, &units, |unit| {
            convert(unit, |unit| realtime_input(unit).into_realtime(UID))
        }))
    }
}
