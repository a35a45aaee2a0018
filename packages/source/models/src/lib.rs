#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Source metadata and the result types every parking source produces.
//!
//! A source invocation yields an [`ImportBatch`]: the records that passed
//! validation, plus one [`RecordError`] for every record that did not.
//! Record-level failures never abort a batch.

use parkapi_parking_models::{RealtimeSite, StaticSite, ValidationError};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

fn default_timezone() -> String {
    "Europe/Berlin".to_string()
}

/// Descriptive metadata for a parking data source.
///
/// Serialized as the `source` block of every output document; absent
/// optional members are omitted rather than written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Stable source identifier (e.g. `"heidelberg"`).
    pub uid: String,
    /// Human-readable name.
    pub name: String,
    /// Public landing page of the operator or dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    /// Endpoint the data is retrieved from, if there is a fixed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// IANA timezone of the upstream's local times.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Whether the source delivers realtime occupancy.
    pub has_realtime_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution_license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution_contributor: Option<String>,
}

impl SourceInfo {
    /// Creates metadata with only the required members set.
    #[must_use]
    pub fn new(uid: &str, name: &str, has_realtime_data: bool) -> Self {
        Self {
            uid: uid.to_owned(),
            name: name.to_owned(),
            public_url: None,
            source_url: None,
            timezone: default_timezone(),
            has_realtime_data,
            attribution_license: None,
            attribution_url: None,
            attribution_contributor: None,
        }
    }

    #[must_use]
    pub fn with_public_url(mut self, url: &str) -> Self {
        self.public_url = Some(url.to_owned());
        self
    }

    #[must_use]
    pub fn with_source_url(mut self, url: &str) -> Self {
        self.source_url = Some(url.to_owned());
        self
    }

    /// Sets the attribution license and, optionally, its contributor.
    #[must_use]
    pub fn with_attribution(mut self, license: &str, contributor: Option<&str>) -> Self {
        self.attribution_license = Some(license.to_owned());
        self.attribution_contributor = contributor.map(str::to_owned);
        self
    }

    #[must_use]
    pub fn with_attribution_contributor(mut self, contributor: &str) -> Self {
        self.attribution_contributor = Some(contributor.to_owned());
        self
    }

    #[must_use]
    pub fn with_attribution_url(mut self, url: &str) -> Self {
        self.attribution_url = Some(url.to_owned());
        self
    }
}

/// Container format a push source accepts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PushFormat {
    Json,
    Csv,
    Xlsx,
    Xml,
}

impl PushFormat {
    /// Guesses the format from a file extension.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "json" | "geojson" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

/// A record-level import failure.
///
/// Carries the best-effort identifier of the offending record, which is
/// `None` when the identifier itself could not be extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("[{source_uid}] record {}: {message}", .record_uid.as_deref().unwrap_or("<unknown>"))]
pub struct RecordError {
    pub source_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_uid: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ValidationError>,
}

impl RecordError {
    /// A failure with a structured validation detail.
    #[must_use]
    pub fn validation(source_uid: &str, record_uid: Option<String>, error: ValidationError) -> Self {
        Self {
            source_uid: source_uid.to_owned(),
            record_uid,
            message: error.to_string(),
            detail: Some(error),
        }
    }

    /// A failure that happened before validation, e.g. while extracting
    /// the record from its container.
    #[must_use]
    pub fn extraction(source_uid: &str, record_uid: Option<String>, message: impl Into<String>) -> Self {
        Self {
            source_uid: source_uid.to_owned(),
            record_uid,
            message: message.into(),
            detail: None,
        }
    }
}

/// The outcome of importing one batch of raw records.
///
/// For a batch of `N` raw records,
/// `items.len() + errors.len() + skipped == N`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportBatch<T> {
    pub items: Vec<T>,
    pub errors: Vec<RecordError>,
    /// Records dropped on purpose (ignore lists, missing realtime values).
    pub skipped: usize,
}

impl<T> Default for ImportBatch<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            errors: Vec::new(),
            skipped: 0,
        }
    }
}

impl<T> ImportBatch<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of raw records this batch accounts for.
    #[must_use]
    pub fn total(&self) -> usize {
        self.items.len() + self.errors.len() + self.skipped
    }

    /// Appends another batch.
    pub fn extend(&mut self, other: Self) {
        self.items.extend(other.items);
        self.errors.extend(other.errors);
        self.skipped += other.skipped;
    }
}

/// Both record kinds produced by one push payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PushBatch {
    pub static_sites: Vec<StaticSite>,
    pub realtime_sites: Vec<RealtimeSite>,
    pub errors: Vec<RecordError>,
    pub skipped: usize,
}

impl PushBatch {
    /// A push result carrying only static records.
    #[must_use]
    pub fn from_static(batch: ImportBatch<StaticSite>) -> Self {
        Self {
            static_sites: batch.items,
            realtime_sites: Vec::new(),
            errors: batch.errors,
            skipped: batch.skipped,
        }
    }

    /// A push result carrying only realtime records.
    #[must_use]
    pub fn from_realtime(batch: ImportBatch<RealtimeSite>) -> Self {
        Self {
            static_sites: Vec::new(),
            realtime_sites: batch.items,
            errors: batch.errors,
            skipped: batch.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use parkapi_parking_models::{FieldError, ReasonCode};
    use serde_json::json;

    use super::*;

    #[test]
    fn source_info_omits_absent_members() {
        let info = SourceInfo::new("ulm", "Stadt Ulm", true).with_public_url("https://www.ulm.de");
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(
            value,
            json!({
                "uid": "ulm",
                "name": "Stadt Ulm",
                "public_url": "https://www.ulm.de",
                "timezone": "Europe/Berlin",
                "has_realtime_data": true,
            })
        );
    }

    #[test]
    fn source_info_timezone_defaults_on_load() {
        let info: SourceInfo =
            serde_json::from_value(json!({"uid": "a", "name": "A", "has_realtime_data": false}))
                .unwrap();
        assert_eq!(info.timezone, "Europe/Berlin");
    }

    #[test]
    fn push_format_from_extension() {
        assert_eq!(PushFormat::from_extension("XLSX"), Some(PushFormat::Xlsx));
        assert_eq!(PushFormat::from_extension("geojson"), Some(PushFormat::Json));
        assert_eq!(PushFormat::from_extension("pdf"), None);
        assert_eq!(PushFormat::Csv.to_string(), "csv");
    }

    #[test]
    fn record_error_keeps_validation_detail() {
        let detail = ValidationError::single(
            FieldError::new(ReasonCode::BelowMinimum, "must be >= 0").at("capacity"),
        );
        let error = RecordError::validation("vrn", Some("2".to_string()), detail);
        assert!(error.to_string().starts_with("[vrn] record 2:"));
        assert!(
            error
                .detail
                .as_ref()
                .unwrap()
                .has("capacity", ReasonCode::BelowMinimum)
        );

        let anonymous = RecordError::extraction("ulm", None, "missing link");
        assert_eq!(anonymous.to_string(), "[ulm] record <unknown>: missing link");
    }

    #[test]
    fn batch_accounts_for_every_record() {
        let mut batch: ImportBatch<u8> = ImportBatch::new();
        batch.items.push(1);
        batch.skipped = 1;
        let mut other = ImportBatch::new();
        other
            .errors
            .push(RecordError::extraction("x", None, "broken"));
        batch.extend(other);
        assert_eq!(batch.total(), 3);
    }
}
