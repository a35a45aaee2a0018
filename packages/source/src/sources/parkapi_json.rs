//! Generic push source for payloads already in canonical shape.
//!
//! The payload is `{"items": [...]}` where every item carries canonical
//! static fields and, if `has_realtime_data` is set, realtime fields too.

use std::collections::BTreeSet;

use parkapi_source_models::{PushBatch, PushFormat, SourceInfo};
use serde_json::{Map, Value};

use crate::collect::{RecordInput, RecordOutcome, collect_records};
use crate::{ParkingSource, PushSource, SourceError};

const UID: &str = "parkapi_json";

/// Canonical JSON push source.
pub struct ParkApiJsonSource {
    info: SourceInfo,
}

impl ParkApiJsonSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            info: SourceInfo::new(UID, "ParkAPI JSON", true),
        }
    }
}

impl Default for ParkApiJsonSource {
    fn default() -> Self {
        Self::new()
    }
}

fn convert<T>(
    item: &Value,
    build: impl FnOnce(RecordInput) -> RecordOutcome<T>,
) -> RecordOutcome<T> {
    item.as_object().map_or_else(
        || RecordOutcome::extraction_failure(UID, None, "item is not an object"),
        |record: &Map<String, Value>| build(RecordInput::from_map(record.clone())),
    )
}

impl ParkingSource for ParkApiJsonSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }
}

impl PushSource for ParkApiJsonSource {
    fn format(&self) -> PushFormat {
        PushFormat::Json
    }

    /// Validates every item as a static site, then the valid ones that
    /// declare realtime data as realtime snapshots.
    fn handle_json(&self, data: &Value) -> Result<PushBatch, SourceError> {
        let items = data
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| SourceError::import(UID, "payload has no items list"))?;

        let static_batch = collect_records(UID, items, |item| {
            convert(item, |input| input.into_static(UID))
        });
        let with_realtime: BTreeSet<String> = static_batch
            .items
            .iter()
            .filter(|site| site.has_realtime_data)
            .map(|site| site.uid.clone())
            .collect();
        let realtime_batch = collect_records(
            UID,
            items.iter().filter(|item| {
                item.get("uid")
                    .and_then(Value::as_str)
                    .is_some_and(|uid| with_realtime.contains(uid))
            }),
            |item| convert(item, |input| input.into_realtime(UID)),
        );

        let mut batch = PushBatch::from_static(static_batch);
        batch.realtime_sites = realtime_batch.items;
        batch.errors.extend(realtime_batch.errors);
        batch.skipped += realtime_batch.skipped;
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn item(uid: &str, has_realtime_data: bool) -> Value {
        json!({
            "uid": uid,
            "name": format!("Parkhaus {uid}"),
            "lat": 48.77,
            "lon": 9.17,
            "capacity": 100,
            "has_realtime_data": has_realtime_data,
            "static_data_updated_at": "2024-04-01T00:00:00Z",
            "realtime_data_updated_at": "2024-04-01T10:00:00Z",
            "realtime_free_capacity": 40
        })
    }

    #[test]
    fn items_split_into_static_and_realtime() {
        let mut broken = item("3", true);
        broken["lat"] = json!(0.0);
        broken["lon"] = json!(0.0);
        let mut stale = item("4", true);
        stale["realtime_data_updated_at"] = json!("gestern");
        let payload = json!({"items": [item("1", true), item("2", false), broken, stale, 5]});

        let batch = ParkApiJsonSource::new().handle_json(&payload).unwrap();
        let static_uids: Vec<&str> = batch.static_sites.iter().map(|s| s.uid.as_str()).collect();
        assert_eq!(static_uids, ["1", "2", "4"]);
        assert_eq!(batch.realtime_sites.len(), 1);
        assert_eq!(batch.realtime_sites[0].uid, "1");
        assert_eq!(batch.realtime_sites[0].realtime_free_capacity, Some(40));

        let failed: Vec<Option<&str>> = batch
            .errors
            .iter()
            .map(|e| e.record_uid.as_deref())
            .collect();
        assert_eq!(failed, [Some("3"), None, Some("4")]);
    }

    #[test]
    fn payload_without_items_is_rejected() {
        let source = ParkApiJsonSource::new();
        assert!(matches!(
            source.handle_json(&json!({"items": {}})),
            Err(SourceError::Import { .. })
        ));
        assert!(matches!(
            source.handle(&crate::PushPayload::Csv(Vec::new())),
            Err(SourceError::UnsupportedFormat { .. })
        ));
    }
}
