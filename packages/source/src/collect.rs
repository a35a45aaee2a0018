//! Record-by-record validation with error collection.
//!
//! Adapters turn each raw record into a [`RecordInput`] (the canonical
//! field names, after renaming and normalizing) and let
//! [`collect_records`] fold the outcomes into an [`ImportBatch`]. A
//! failing record becomes a [`RecordError`] in the batch and iteration
//! carries on.

use std::collections::BTreeSet;

use chrono::Utc;
use parkapi_normalize::datetime;
use parkapi_parking_models::{
    FieldError, FieldViolation, RealtimeSite, StaticSite, ValidationError,
};
use parkapi_source_models::{ImportBatch, RecordError};
use serde_json::{Map, Value};

/// What became of one raw record.
#[derive(Debug)]
pub enum RecordOutcome<T> {
    /// A valid record.
    Emit(T),
    /// Deliberately dropped (ignore-list, no data yet).
    Skip,
    /// Rejected, with the reason.
    Fail(RecordError),
}

impl<T> RecordOutcome<T> {
    /// A failure that happened before validation, e.g. while pulling a
    /// record out of its container.
    pub fn extraction_failure(
        source_uid: &str,
        record_uid: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Fail(RecordError::extraction(source_uid, record_uid, message))
    }
}

/// Runs `convert` over every raw record and folds the outcomes.
///
/// `items.len() + errors.len() + skipped` always equals the number of
/// records consumed.
pub fn collect_records<R, T>(
    source_uid: &str,
    records: impl IntoIterator<Item = R>,
    mut convert: impl FnMut(R) -> RecordOutcome<T>,
) -> ImportBatch<T> {
    let mut batch = ImportBatch::new();
    for record in records {
        match convert(record) {
            RecordOutcome::Emit(item) => batch.items.push(item),
            RecordOutcome::Skip => batch.skipped += 1,
            RecordOutcome::Fail(error) => {
                log::warn!("{error}");
                batch.errors.push(error);
            }
        }
    }
    log::debug!(
        "[{source_uid}] collected {} records, {} errors, {} skipped",
        batch.items.len(),
        batch.errors.len(),
        batch.skipped
    );
    batch
}

/// The current instant as a canonical timestamp value, for upstreams that
/// do not date their data.
#[must_use]
pub fn now_timestamp() -> Value {
    Value::String(datetime::to_canonical(Utc::now()))
}

/// Best-effort uid of a raw or renamed record.
#[must_use]
pub fn record_uid(record: &Map<String, Value>) -> Option<String> {
    match record.get("uid")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A canonical input mapping under construction.
///
/// Normalizer failures are kept next to the mapping and reported together
/// with whatever the model's validating constructor finds.
#[derive(Debug, Clone, Default)]
pub struct RecordInput {
    fields: Map<String, Value>,
    violations: Vec<FieldViolation>,
}

impl RecordInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing mapping.
    #[must_use]
    pub const fn from_map(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            violations: Vec::new(),
        }
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Sets `field` only if `value` is present.
    pub fn set_opt<V: Into<Value>>(&mut self, field: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(field, value);
        }
        self
    }

    /// Sets the result of a normalizer, or records its failure at `field`.
    pub fn try_set(&mut self, field: &str, result: Result<Value, FieldError>) -> &mut Self {
        match result {
            Ok(value) => {
                self.set(field, value);
            }
            Err(e) => self.violations.push(e.at(field)),
        }
        self
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    /// Records a violation found while building the input.
    pub fn violate(&mut self, violation: FieldViolation) -> &mut Self {
        self.violations.push(violation);
        self
    }

    #[must_use]
    pub fn uid(&self) -> Option<String> {
        record_uid(&self.fields)
    }

    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Validates as a static site.
    pub fn into_static(self, source_uid: &str) -> RecordOutcome<StaticSite> {
        self.validate(source_uid, StaticSite::validate)
    }

    /// Validates as a realtime snapshot.
    pub fn into_realtime(self, source_uid: &str) -> RecordOutcome<RealtimeSite> {
        self.validate(source_uid, RealtimeSite::validate)
    }

    /// Validates through `constructor`, merging its violations with the
    /// ones collected while building. A field that already failed to
    /// normalize is not reported a second time as missing.
    pub fn validate<T>(
        self,
        source_uid: &str,
        constructor: impl FnOnce(&Map<String, Value>) -> Result<T, ValidationError>,
    ) -> RecordOutcome<T> {
        let uid = self.uid();
        let result = constructor(&self.fields);
        if self.violations.is_empty() {
            return match result {
                Ok(record) => RecordOutcome::Emit(record),
                Err(e) => RecordOutcome::Fail(RecordError::validation(source_uid, uid, e)),
            };
        }

        let rejected: BTreeSet<&str> = self
            .violations
            .iter()
            .filter_map(|v| v.field.as_deref())
            .collect();
        let mut violations = self.violations.clone();
        if let Err(e) = result {
            violations.extend(
                e.violations
                    .into_iter()
                    .filter(|v| v.field.as_deref().is_none_or(|f| !rejected.contains(f))),
            );
        }
        RecordOutcome::Fail(RecordError::validation(
            source_uid,
            uid,
            ValidationError::new(violations),
        ))
    }
}

#[cfg(test)]
mod tests {
    use parkapi_parking_models::ReasonCode;
    use serde_json::json;

    use super::*;

    fn site_input(uid: &str) -> RecordInput {
        let mut input = RecordInput::new();
        input
            .set("uid", uid)
            .set("name", "Parkhaus")
            .set("lat", 48.5)
            .set("lon", 9.2)
            .set("static_data_updated_at", "2024-04-01T00:00:00Z");
        input
    }

    #[test]
    fn one_bad_record_does_not_stop_the_batch() {
        let inputs = vec![site_input("1"), site_input(""), site_input("3")];
        let batch = collect_records("test", inputs, |input| input.into_static("test"));
        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.total(), 3);
        assert_eq!(batch.errors[0].record_uid, None);
        assert!(batch.items.iter().all(|site| !site.uid.is_empty()));
    }

    #[test]
    fn skips_are_counted_separately() {
        let batch = collect_records("test", ["keep", "drop"], |raw| {
            if raw == "drop" {
                RecordOutcome::Skip
            } else {
                site_input(raw).into_static("test")
            }
        });
        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.skipped, 1);
        assert!(batch.errors.is_empty());
    }

    #[test]
    fn normalizer_failures_are_not_reported_twice() {
        let mut input = site_input("p1");
        input.fields.remove("lat");
        input.try_set(
            "lat",
            Err(FieldError::new(ReasonCode::InvalidFormat, "not a WKT point")),
        );
        input.set("capacity", -1);

        let RecordOutcome::Fail(error) = input.into_static("test") else {
            panic!("expected a failure");
        };
        assert_eq!(error.record_uid.as_deref(), Some("p1"));
        let detail = error.detail.unwrap();
        assert!(detail.has("lat", ReasonCode::InvalidFormat));
        assert!(!detail.has("lat", ReasonCode::Required));
        assert!(detail.has("capacity", ReasonCode::BelowMinimum));
    }

    #[test]
    fn numeric_uids_are_stringified() {
        let record = json!({"uid": 17});
        assert_eq!(record_uid(record.as_object().unwrap()).as_deref(), Some("17"));
        let record = json!({"uid": null});
        assert_eq!(record_uid(record.as_object().unwrap()), None);
    }
}
