//! Config-driven push source definition.
//!
//! [`SourceDefinition`] captures everything unique about a push source in
//! a TOML document: the container options, a table naming the upstream
//! column and normalizer chain behind each canonical field, address
//! templates, constants, and the geometry and opening-hours extractors. A
//! single generic [`PushSource`] implementation handles all of them.
//!
//! ```toml
//! format = "csv"
//!
//! [source]
//! uid = "reutlingen"
//! name = "Stadt Reutlingen"
//! has_realtime_data = false
//!
//! [fields]
//! uid = "id"
//! name = "ort"
//!
//! [fields.capacity]
//! column = "Kapazität"
//! normalize = [{ type = "german_decimal" }]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use chrono::NaiveTime;
use parkapi_normalize::opening_hours::{WeeklyHours, parse_time};
use parkapi_normalize::{MappedBoolean, Normalizer, UtmZone, apply_chain, blank, decimal, geo, text};
use parkapi_parking_models::FieldError;
use parkapi_source_models::{PushBatch, PushFormat, RecordError, SourceInfo};
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::collect::{RecordInput, RecordOutcome, collect_records, now_timestamp};
use crate::header::{HeaderIndex, split_header};
use crate::xlsx::Workbook;
use crate::xml::XmlElement;
use crate::{ParkingSource, PushSource, SourceError};

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").unwrap_or_else(|e| panic!("{e}")));

const fn default_true() -> bool {
    true
}

const fn default_delimiter() -> u8 {
    b','
}

fn ascii_delimiter<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let delimiter = char::deserialize(deserializer)?;
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| serde::de::Error::custom(format!("delimiter {delimiter:?} is not ASCII")))
}

// ── Top-level source definition ──────────────────────────────────────────

/// A complete, config-driven push source.
#[derive(Debug, Deserialize)]
pub struct SourceDefinition {
    /// Identity and attribution.
    pub source: SourceInfo,
    /// Container format of the payload.
    pub format: PushFormat,
    /// Which record kind each raw record becomes.
    #[serde(default)]
    pub record: RecordKind,
    #[serde(default)]
    pub csv: CsvOptions,
    #[serde(default)]
    pub xlsx: XlsxOptions,
    #[serde(default)]
    pub json: JsonOptions,
    #[serde(default)]
    pub xml: XmlOptions,
    /// Treat empty and whitespace-only cells as absent before any
    /// normalizer runs. Defaults to `true`.
    #[serde(default = "default_true")]
    pub empty_as_absent: bool,
    /// Canonical field name to upstream column.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSource>,
    /// Canonical field name to a `{column}` template. The field is left
    /// unset when any referenced column is empty.
    #[serde(default)]
    pub templates: BTreeMap<String, String>,
    /// Canonical field name to a fixed value.
    #[serde(default)]
    pub constants: BTreeMap<String, Value>,
    /// Where `lat`/`lon` come from when not plain columns.
    #[serde(default)]
    pub geometry: Option<GeometryExtractor>,
    /// Spreadsheet opening-hour columns, assembled into `opening_hours`.
    #[serde(default)]
    pub opening_hours: Option<OpeningHoursColumns>,
    /// Record uids that are dropped on purpose.
    #[serde(default)]
    pub ignore_uids: Vec<String>,
}

/// Record kind produced from each raw record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    #[default]
    Static,
    Realtime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsvOptions {
    #[serde(default = "default_delimiter", deserialize_with = "ascii_delimiter")]
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct XlsxOptions {
    /// Sheet to read; the first sheet when absent.
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonOptions {
    /// `/`-separated object keys leading to the record list; the document
    /// itself when absent.
    pub records_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct XmlOptions {
    /// `/`-separated element path of the record elements below the root.
    #[serde(default)]
    pub record_path: String,
}

// ── Strategy enums ───────────────────────────────────────────────────────

/// Where a canonical field comes from.
///
/// Either a bare column name, or a column plus a normalizer chain:
/// ```toml
/// [fields.has_fee]
/// column = "gebuehren"
/// normalize = [{ type = "mapped_boolean", mapping = { ja = true, nein = false } }]
/// ```
///
/// Columns are header names for row containers, keys for JSON records and
/// flattened `a/b` or `a/b@attr` paths for XML records.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldSource {
    Column(String),
    Mapped {
        column: String,
        #[serde(default)]
        normalize: Vec<Normalizer>,
    },
}

impl FieldSource {
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Column(column) | Self::Mapped { column, .. } => column,
        }
    }

    fn extract(&self, record: &Map<String, Value>) -> Result<Value, FieldError> {
        let raw = record.get(self.column()).cloned().unwrap_or(Value::Null);
        match self {
            Self::Column(_) => Ok(raw),
            Self::Mapped { normalize, .. } => apply_chain(normalize, raw),
        }
    }
}

/// How coordinates are read.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeometryExtractor {
    /// A WKT `POINT (lon lat)` column.
    WktPoint { column: String },
    /// Easting and northing columns in UTM zone 32N.
    Utm32 { easting: String, northing: String },
}

impl GeometryExtractor {
    fn columns(&self) -> Vec<&str> {
        match self {
            Self::WktPoint { column } => vec![column.as_str()],
            Self::Utm32 { easting, northing } => vec![easting.as_str(), northing.as_str()],
        }
    }

    /// `(lon, lat)` of the record.
    fn extract(&self, record: &Map<String, Value>) -> Result<(f64, f64), FieldError> {
        let cell = |column: &str| record.get(column).cloned().unwrap_or(Value::Null);
        match self {
            Self::WktPoint { column } => match cell(column) {
                Value::String(s) => geo::parse_wkt_point(&s),
                Value::Null => Err(FieldError::required()),
                other => Err(FieldError::invalid_type("WKT point", &other)),
            },
            Self::Utm32 { easting, northing } => {
                let (easting, northing) = (cell(easting), cell(northing));
                if easting.is_null() || northing.is_null() {
                    return Err(FieldError::required());
                }
                Ok(UtmZone::ZONE_32N.to_lon_lat(
                    decimal::german_decimal(&easting)?,
                    decimal::german_decimal(&northing)?,
                ))
            }
        }
    }
}

/// Spreadsheet opening-hour columns. Each span is a `[begin, end]` column
/// pair.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpeningHoursColumns {
    /// A `ja`/`nein` column declaring 24/7 opening.
    pub always_open: Option<String>,
    pub weekday: Option<[String; 2]>,
    pub saturday: Option<[String; 2]>,
    pub sunday: Option<[String; 2]>,
    pub public_holiday: Option<[String; 2]>,
}

type Span = Option<(NaiveTime, NaiveTime)>;

impl OpeningHoursColumns {
    fn spans(&self) -> [Option<&[String; 2]>; 4] {
        [
            self.weekday.as_ref(),
            self.saturday.as_ref(),
            self.sunday.as_ref(),
            self.public_holiday.as_ref(),
        ]
    }

    fn columns(&self) -> Vec<&str> {
        self.always_open
            .iter()
            .map(String::as_str)
            .chain(
                self.spans()
                    .into_iter()
                    .flatten()
                    .flat_map(|pair| pair.iter().map(String::as_str)),
            )
            .collect()
    }

    fn extract(&self, record: &Map<String, Value>) -> Result<Option<String>, FieldError> {
        let cell = |column: &str| blank::excel_blank(record.get(column).cloned().unwrap_or(Value::Null));

        let always_open = match &self.always_open {
            Some(column) => match cell(column) {
                Value::Null => false,
                value => MappedBoolean::german().validate(&value)?,
            },
            None => false,
        };

        let span = |pair: Option<&[String; 2]>| -> Result<Span, FieldError> {
            let Some([begin, end]) = pair else {
                return Ok(None);
            };
            let (begin, end) = (cell(begin), cell(end));
            if begin.is_null() || end.is_null() {
                return Ok(None);
            }
            Ok(Some((parse_time(&begin)?, parse_time(&end)?)))
        };

        let [weekday, saturday, sunday, public_holiday] = self.spans();
        let hours = WeeklyHours {
            always_open,
            weekday: span(weekday)?,
            saturday: span(saturday)?,
            sunday: span(sunday)?,
            public_holiday: span(public_holiday)?,
        };
        Ok(hours.to_osm())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn scalar_text(value: &Value) -> Option<String> {
    let text = text::number_to_string(value).ok()?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Fills `{column}` placeholders, or `None` if any of them is empty.
fn render_template(template: &str, record: &Map<String, Value>) -> Option<String> {
    let mut complete = true;
    let rendered = PLACEHOLDER_RE.replace_all(template, |caps: &Captures<'_>| {
        record.get(&caps[1]).and_then(scalar_text).unwrap_or_else(|| {
            complete = false;
            String::new()
        })
    });
    complete.then(|| rendered.into_owned())
}

fn template_columns(template: &str) -> impl Iterator<Item = &str> {
    PLACEHOLDER_RE
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

fn is_blank_row(row: &[Value]) -> bool {
    row.iter().all(blank::is_excel_blank)
}

// ── Generic implementation ───────────────────────────────────────────────

/// A raw record, `None` for a blank spreadsheet row.
type RawRecord = Result<Option<Map<String, Value>>, RecordError>;

impl SourceDefinition {
    /// Every upstream column the definition reads.
    #[must_use]
    pub fn referenced_columns(&self) -> BTreeSet<&str> {
        let mut columns: BTreeSet<&str> = self.fields.values().map(FieldSource::column).collect();
        for template in self.templates.values() {
            columns.extend(template_columns(template));
        }
        if let Some(geometry) = &self.geometry {
            columns.extend(geometry.columns());
        }
        if let Some(hours) = &self.opening_hours {
            columns.extend(hours.columns());
        }
        columns
    }

    /// Whether the definition maps `field` to upstream data or a constant.
    fn provides(&self, field: &str) -> bool {
        self.fields.contains_key(field)
            || self.templates.contains_key(field)
            || self.constants.contains_key(field)
    }

    /// Builds the canonical input mapping of one raw record.
    fn build_input(&self, record: &Map<String, Value>) -> RecordInput {
        let record: Map<String, Value> = if self.empty_as_absent {
            record
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) if s.trim().is_empty() => Value::Null,
                        other => other.clone(),
                    };
                    (key.clone(), value)
                })
                .collect()
        } else {
            record.clone()
        };

        let mut input = RecordInput::new();
        for (field, value) in &self.constants {
            input.set(field, value.clone());
        }
        for (field, source) in &self.fields {
            input.try_set(field, source.extract(&record));
        }
        for (field, template) in &self.templates {
            input.set_opt(field, render_template(template, &record));
        }

        if let Some(geometry) = &self.geometry {
            match geometry.extract(&record) {
                Ok((lon, lat)) => {
                    input.set("lat", lat).set("lon", lon);
                }
                Err(e) => {
                    input.violate(e.clone().at("lat")).violate(e.at("lon"));
                }
            }
        }

        if let Some(hours) = &self.opening_hours {
            match hours.extract(&record) {
                Ok(osm) => {
                    input.set_opt("opening_hours", osm);
                }
                Err(e) => {
                    input.violate(e.at("opening_hours"));
                }
            }
        }

        match self.record {
            RecordKind::Static => {
                if !self.provides("static_data_updated_at") {
                    input.set("static_data_updated_at", now_timestamp());
                }
                if input.get("has_realtime_data").is_none() {
                    input.set("has_realtime_data", self.source.has_realtime_data);
                }
            }
            RecordKind::Realtime => {
                if !self.provides("realtime_data_updated_at") {
                    input.set("realtime_data_updated_at", now_timestamp());
                }
            }
        }
        input
    }

    fn convert<T>(
        &self,
        record: RawRecord,
        validate: impl FnOnce(RecordInput, &str) -> RecordOutcome<T>,
    ) -> RecordOutcome<T> {
        let record = match record {
            Ok(Some(record)) => record,
            Ok(None) => {
                log::debug!("[{}] skipping blank row", self.source.uid);
                return RecordOutcome::Skip;
            }
            Err(e) => return RecordOutcome::Fail(e),
        };
        let input = self.build_input(&record);
        if let Some(uid) = input.uid()
            && self.ignore_uids.contains(&uid)
        {
            log::debug!("[{}] ignoring record {uid}", self.source.uid);
            return RecordOutcome::Skip;
        }
        validate(input, &self.source.uid)
    }

    /// Converts raw records into the declared record kind.
    fn import(&self, records: impl IntoIterator<Item = RawRecord>) -> PushBatch {
        let uid = self.source.uid.as_str();
        match self.record {
            RecordKind::Static => PushBatch::from_static(collect_records(uid, records, |r| {
                self.convert(r, RecordInput::into_static)
            })),
            RecordKind::Realtime => PushBatch::from_realtime(collect_records(uid, records, |r| {
                self.convert(r, RecordInput::into_realtime)
            })),
        }
    }

    fn import_rows(&self, rows: &[Vec<Value>]) -> Result<PushBatch, SourceError> {
        let (header, data) = split_header(&self.source.uid, rows)?;
        let index = HeaderIndex::resolve(&self.source.uid, header, self.referenced_columns())?;
        Ok(self.import(
            data.iter()
                .map(|row| Ok((!is_blank_row(row)).then(|| index.record(row)))),
        ))
    }
}

impl ParkingSource for SourceDefinition {
    fn info(&self) -> &SourceInfo {
        &self.source
    }
}

impl PushSource for SourceDefinition {
    fn format(&self) -> PushFormat {
        self.format
    }

    fn csv_delimiter(&self) -> u8 {
        self.csv.delimiter
    }

    fn handle_csv(&self, rows: &[Vec<Value>]) -> Result<PushBatch, SourceError> {
        if self.format != PushFormat::Csv {
            return Err(self.unsupported(PushFormat::Csv));
        }
        self.import_rows(rows)
    }

    fn handle_xlsx(&self, workbook: &Workbook) -> Result<PushBatch, SourceError> {
        if self.format != PushFormat::Xlsx {
            return Err(self.unsupported(PushFormat::Xlsx));
        }
        let sheet = workbook.sheet(self.xlsx.sheet.as_deref()).ok_or_else(|| {
            SourceError::import(
                &self.source.uid,
                format!(
                    "workbook has no sheet {}",
                    self.xlsx.sheet.as_deref().unwrap_or("at all")
                ),
            )
        })?;
        self.import_rows(&sheet.rows)
    }

    fn handle_json(&self, data: &Value) -> Result<PushBatch, SourceError> {
        if self.format != PushFormat::Json {
            return Err(self.unsupported(PushFormat::Json));
        }
        let uid = self.source.uid.as_str();
        let mut node = data;
        for key in self
            .json
            .records_path
            .iter()
            .flat_map(|path| path.split('/'))
            .filter(|key| !key.is_empty())
        {
            node = node
                .get(key)
                .ok_or_else(|| SourceError::import(uid, format!("missing key {key}")))?;
        }
        let items = node
            .as_array()
            .ok_or_else(|| SourceError::import(uid, "expected a list of records"))?;

        Ok(self.import(items.iter().map(|item| {
            item.as_object()
                .cloned()
                .map(Some)
                .ok_or_else(|| RecordError::extraction(uid, None, "record is not an object"))
        })))
    }

    fn handle_xml(&self, root: &XmlElement) -> Result<PushBatch, SourceError> {
        if self.format != PushFormat::Xml {
            return Err(self.unsupported(PushFormat::Xml));
        }
        let path = self.xml.record_path.trim_matches('/');
        let parent = path.rsplit_once('/').map_or("", |(parent, _)| parent);
        if root.find_path(parent).is_none() {
            return Err(SourceError::import(
                &self.source.uid,
                format!("cannot find element {parent}"),
            ));
        }
        Ok(self.import(root.find_all(path).into_iter().map(|e| Ok(Some(e.flatten())))))
    }
}

/// Parses a [`SourceDefinition`] from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is malformed, misses required members, or
/// declares an invalid normalizer table.
pub fn parse_source_toml(toml_str: &str) -> Result<SourceDefinition, String> {
    toml::de::from_str(toml_str).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use parkapi_parking_models::{ParkingSiteType, ReasonCode};
    use serde_json::json;

    use super::*;

    const HEADER_CSV: &str = r#"
        format = "csv"

        [source]
        uid = "test"
        name = "Test"
        has_realtime_data = false

        [fields]
        uid = "id"
        name = "name"
        capacity = "capacity"

        [constants]
        lat = 48.5
        lon = 9.2
    "#;

    fn definition(toml_str: &str) -> SourceDefinition {
        parse_source_toml(toml_str).unwrap()
    }

    #[test]
    fn header_mapped_rows_partially_succeed() {
        let source = definition(HEADER_CSV);
        let batch = source
            .handle_bytes(b"id,name,capacity\n1,Lot A,10\n2,,-5\n")
            .unwrap();
        assert_eq!(batch.static_sites.len(), 1);
        assert_eq!(batch.static_sites[0].uid, "1");
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].record_uid.as_deref(), Some("2"));
        let detail = batch.errors[0].detail.as_ref().unwrap();
        assert!(detail.has("name", ReasonCode::Required));
        assert!(detail.has("capacity", ReasonCode::BelowMinimum));
    }

    #[test]
    fn missing_header_aborts_the_payload() {
        let source = definition(HEADER_CSV);
        let error = source.handle_bytes(b"id,name\n1,Lot A\n").unwrap_err();
        assert!(matches!(error, SourceError::Import { .. }));
    }

    #[test]
    fn refuses_other_formats() {
        let source = definition(HEADER_CSV);
        assert!(matches!(
            source.handle_json(&json!([])),
            Err(SourceError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn templates_geometry_and_ignore_list() {
        let source = definition(
            r#"
            format = "json"
            ignore_uids = ["3"]

            [source]
            uid = "test"
            name = "Test"
            has_realtime_data = true

            [json]
            records_path = "data/items"

            [fields]
            uid = { column = "id", normalize = [{ type = "number_to_string" }] }
            name = "name"

            [fields.type]
            column = "art"
            normalize = [{ type = "enum", target = "parking_site_type", on_unmapped = "fallback", fallback = "OTHER", case_insensitive = true, mapping = { parkhaus = "CAR_PARK" } }]

            [templates]
            address = "{street}, {city}"

            [geometry]
            type = "wkt_point"
            column = "geom"
            "#,
        );
        let payload = json!({"data": {"items": [
            {"id": 1, "name": "A", "art": "Parkhaus", "street": "Hauptstr. 1", "city": "Ulm", "geom": "POINT (9.99 48.4)"},
            {"id": 2, "name": "B", "art": "Scheune", "city": "Ulm", "geom": "POINT (9.98 48.39)"},
            {"id": 3, "name": "C", "geom": "POINT (9.97 48.38)"},
            {"id": 4, "name": "D", "geom": "nowhere"},
            "not an object",
        ]}});

        let batch = source.handle_json(&payload).unwrap();
        assert_eq!(batch.static_sites.len(), 2);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.errors.len(), 2);

        let first = &batch.static_sites[0];
        assert_eq!(first.address.as_deref(), Some("Hauptstr. 1, Ulm"));
        assert_eq!(first.site_type, Some(ParkingSiteType::CarPark));
        assert!(first.has_realtime_data);
        assert!((first.lon - 9.99).abs() < f64::EPSILON);

        let second = &batch.static_sites[1];
        assert_eq!(second.address, None);
        assert_eq!(second.site_type, Some(ParkingSiteType::Other));

        let geometry_error = batch.errors[0].detail.as_ref().unwrap();
        assert!(geometry_error.has("lat", ReasonCode::InvalidFormat));
        assert_eq!(batch.errors[1].record_uid, None);
    }

    #[test]
    fn json_payload_must_hold_a_list() {
        let source = definition(
            r#"
            format = "json"
            [source]
            uid = "test"
            name = "Test"
            has_realtime_data = false
            "#,
        );
        assert!(matches!(
            source.handle_json(&json!({"items": []})),
            Err(SourceError::Import { .. })
        ));
        assert_eq!(source.handle_json(&json!([])).unwrap().static_sites.len(), 0);
    }

    #[test]
    fn opening_hour_columns() {
        let columns = OpeningHoursColumns {
            always_open: Some("24/7".to_string()),
            weekday: Some(["mo_fr_begin".to_string(), "mo_fr_end".to_string()]),
            saturday: Some(["sa_begin".to_string(), "sa_end".to_string()]),
            ..OpeningHoursColumns::default()
        };
        let record = json!({"24/7": "nein", "mo_fr_begin": "07:00:00", "mo_fr_end": "19:30:00", "sa_begin": "-", "sa_end": "-"});
        assert_eq!(
            columns.extract(record.as_object().unwrap()).unwrap().as_deref(),
            Some("Mo-Fr 07:00-19:30")
        );
        let record = json!({"24/7": "ja"});
        assert_eq!(
            columns.extract(record.as_object().unwrap()).unwrap().as_deref(),
            Some("24/7")
        );
        let record = json!({"24/7": "vielleicht"});
        assert!(columns.extract(record.as_object().unwrap()).is_err());
    }

    #[test]
    fn realtime_records_from_xml() {
        let source = definition(
            r#"
            format = "xml"
            record = "realtime"

            [source]
            uid = "test"
            name = "Test"
            has_realtime_data = true

            [xml]
            record_path = "publication/status"

            [fields]
            uid = "reference@id"
            realtime_free_capacity = "free"
            "#,
        );
        let root = XmlElement::parse(
            r#"<payload><publication>
                <status><reference id="P1"/><free>12</free></status>
                <status><reference id="P2"/><free>-1</free></status>
            </publication></payload>"#,
        )
        .unwrap();
        let batch = source.handle_xml(&root).unwrap();
        assert_eq!(batch.realtime_sites.len(), 1);
        assert_eq!(batch.realtime_sites[0].realtime_free_capacity, Some(12));
        assert_eq!(batch.errors.len(), 1);
        assert!(batch.static_sites.is_empty());

        let empty = XmlElement::parse("<payload/>").unwrap();
        assert!(source.handle_xml(&empty).is_err());
    }

    #[test]
    fn blank_rows_are_skipped_not_lost() {
        let source = definition(HEADER_CSV);
        let batch = source
            .handle_bytes(b"id,name,capacity\n1,Lot A,10\n,,\n-,-,-\n")
            .unwrap();
        assert_eq!(batch.static_sites.len(), 1);
        assert!(batch.errors.is_empty());
        assert_eq!(batch.skipped, 2);
        assert_eq!(
            batch.static_sites.len() + batch.errors.len() + batch.skipped,
            3
        );
    }

    #[test]
    fn mapped_realtime_timestamp_is_required() {
        let source = definition(
            r#"
            format = "xml"
            record = "realtime"

            [source]
            uid = "test"
            name = "Test"
            has_realtime_data = true

            [xml]
            record_path = "publication/status"

            [fields]
            uid = "reference@id"
            realtime_free_capacity = "free"
            realtime_data_updated_at = { column = "time", normalize = [{ type = "spaced_datetime" }] }
            "#,
        );
        let root = XmlElement::parse(
            r#"<payload><publication>
                <status><reference id="P1"/><free>12</free><time>2024-04-01 10:00:00</time></status>
                <status><reference id="P2"/><free>3</free><time></time></status>
            </publication></payload>"#,
        )
        .unwrap();
        let batch = source.handle_xml(&root).unwrap();
        assert_eq!(batch.realtime_sites.len(), 1);
        assert_eq!(batch.realtime_sites[0].uid, "P1");
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].record_uid.as_deref(), Some("P2"));
        assert!(
            batch.errors[0]
                .detail
                .as_ref()
                .unwrap()
                .has("realtime_data_updated_at", ReasonCode::Required)
        );
    }

    #[test]
    fn csv_delimiter_must_be_ascii() {
        let with_delimiter = |delimiter: &str| {
            format!(
                "format = \"csv\"\n[csv]\ndelimiter = \"{delimiter}\"\n[source]\nuid = \"test\"\nname = \"Test\"\nhas_realtime_data = false\n"
            )
        };
        assert_eq!(definition(&with_delimiter(";")).csv_delimiter(), b';');
        assert!(parse_source_toml(&with_delimiter("§")).is_err());
        assert!(parse_source_toml(&with_delimiter("€")).is_err());
    }
}
