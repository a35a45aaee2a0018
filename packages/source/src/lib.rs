#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parking source adapters.
//!
//! Every upstream integration implements [`ParkingSource`] plus one of two
//! roles: a [`PullSource`] retrieves its own data, a [`PushSource`] is handed
//! an already retrieved payload in its declared [`PushFormat`]. Both roles
//! return batches built with [`collect::collect_records`], so one broken
//! record never costs the rest of the batch.

pub mod collect;
pub mod config;
pub mod csv_rows;
pub mod header;
pub mod registry;
pub mod source_def;
pub mod sources;
pub mod static_template;
pub mod xlsx;
pub mod xml;

use async_trait::async_trait;
use parkapi_parking_models::{RealtimeSite, StaticSite};
use parkapi_scraper::ScrapeError;
use parkapi_source_models::{ImportBatch, PushBatch, PushFormat, SourceInfo};
use serde_json::Value;

pub use config::Config;
pub use registry::{RegistryFilter, Source, SourceRegistry};
pub use xlsx::Workbook;
pub use xml::XmlElement;

/// Source-level failures. Any of these aborts the whole invocation for
/// that source; record-level problems never end up here.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Required configuration keys are not set.
    #[error("[{source_uid}] missing required config keys: {}", .keys.join(", "))]
    MissingConfig {
        source_uid: String,
        keys: Vec<String>,
    },

    /// The payload could not be turned into records.
    #[error("[{source_uid}] import failed: {message}")]
    Import { source_uid: String, message: String },

    /// A push source was handed a container it does not read.
    #[error("[{source_uid}] does not accept {format} payloads")]
    UnsupportedFormat {
        source_uid: String,
        format: PushFormat,
    },

    /// No source is registered under this uid.
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    /// The source exists but is not a pull (or push) source.
    #[error("[{source_uid}] is not a {expected} source")]
    WrongRole {
        source_uid: String,
        expected: &'static str,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing failed.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// XML parsing failed.
    #[error("XML parse error: {0}")]
    Xml(#[from] xml::XmlError),

    /// XLSX parsing failed.
    #[error("XLSX parse error: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    /// TOML parsing failed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Upstream retrieval failed.
    #[error("Retrieval failed: {0}")]
    Scrape(#[from] ScrapeError),
}

impl SourceError {
    /// Shorthand for [`SourceError::Import`].
    pub fn import(source_uid: &str, message: impl Into<String>) -> Self {
        Self::Import {
            source_uid: source_uid.to_string(),
            message: message.into(),
        }
    }
}

/// What every adapter declares about itself.
pub trait ParkingSource: Send + Sync {
    /// Identity and attribution of the source.
    fn info(&self) -> &SourceInfo;

    /// Config keys that must be set before the source may be used.
    fn required_config_keys(&self) -> &[&'static str] {
        &[]
    }

    /// Shorthand for `info().uid`.
    fn uid(&self) -> &str {
        &self.info().uid
    }
}

/// An adapter that retrieves its upstream data itself.
///
/// Every step of one call is awaited in sequence: fetch, parse, then
/// validate record by record.
#[async_trait]
pub trait PullSource: ParkingSource {
    /// Fetches and validates static site metadata.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if retrieval fails or the payload has the
    /// wrong shape. Invalid records are reported in the batch instead.
    async fn get_static_sites(&self) -> Result<ImportBatch<StaticSite>, SourceError>;

    /// Fetches and validates realtime occupancy.
    ///
    /// # Errors
    ///
    /// Same as [`PullSource::get_static_sites`].
    async fn get_realtime_sites(&self) -> Result<ImportBatch<RealtimeSite>, SourceError>;
}

/// An already retrieved payload, parsed into its container shape.
#[derive(Debug, Clone)]
pub enum PushPayload {
    Json(Value),
    Csv(Vec<Vec<Value>>),
    Xlsx(Workbook),
    Xml(XmlElement),
}

impl PushPayload {
    #[must_use]
    pub const fn format(&self) -> PushFormat {
        match self {
            Self::Json(_) => PushFormat::Json,
            Self::Csv(_) => PushFormat::Csv,
            Self::Xlsx(_) => PushFormat::Xlsx,
            Self::Xml(_) => PushFormat::Xml,
        }
    }
}

/// An adapter that is handed its payload.
///
/// Implementors override the `handle_*` method for their declared
/// [`PushSource::format`]; the others refuse the payload.
pub trait PushSource: ParkingSource {
    /// The container format this source reads.
    fn format(&self) -> PushFormat;

    /// Field delimiter for CSV payloads.
    fn csv_delimiter(&self) -> u8 {
        b','
    }

    /// Handles a decoded JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the document has the wrong shape.
    fn handle_json(&self, data: &Value) -> Result<PushBatch, SourceError> {
        let _ = data;
        Err(self.unsupported(PushFormat::Json))
    }

    /// Handles a CSV row matrix, header row included.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the header row is unusable.
    fn handle_csv(&self, rows: &[Vec<Value>]) -> Result<PushBatch, SourceError> {
        let _ = rows;
        Err(self.unsupported(PushFormat::Csv))
    }

    /// Handles a workbook.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the expected sheet or header is missing.
    fn handle_xlsx(&self, workbook: &Workbook) -> Result<PushBatch, SourceError> {
        let _ = workbook;
        Err(self.unsupported(PushFormat::Xlsx))
    }

    /// Handles an XML element tree.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the tree has the wrong shape.
    fn handle_xml(&self, root: &XmlElement) -> Result<PushBatch, SourceError> {
        let _ = root;
        Err(self.unsupported(PushFormat::Xml))
    }

    /// Dispatches a parsed payload to the matching `handle_*` method.
    ///
    /// # Errors
    ///
    /// Propagates the handler's [`SourceError`].
    fn handle(&self, payload: &PushPayload) -> Result<PushBatch, SourceError> {
        let batch = match payload {
            PushPayload::Json(data) => self.handle_json(data)?,
            PushPayload::Csv(rows) => self.handle_csv(rows)?,
            PushPayload::Xlsx(workbook) => self.handle_xlsx(workbook)?,
            PushPayload::Xml(root) => self.handle_xml(root)?,
        };
        log::info!(
            "[{}] {} static sites, {} realtime sites, {} errors",
            self.uid(),
            batch.static_sites.len(),
            batch.realtime_sites.len(),
            batch.errors.len(),
        );
        Ok(batch)
    }

    /// Parses raw bytes in the declared format, then handles them.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the bytes are not a valid container of
    /// the declared format, or if the handler fails.
    fn handle_bytes(&self, bytes: &[u8]) -> Result<PushBatch, SourceError> {
        let payload = match self.format() {
            PushFormat::Json => PushPayload::Json(serde_json::from_slice(bytes)?),
            PushFormat::Csv => PushPayload::Csv(csv_rows::parse_csv(bytes, self.csv_delimiter())?),
            PushFormat::Xlsx => PushPayload::Xlsx(Workbook::from_bytes(bytes)?),
            PushFormat::Xml => {
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    SourceError::import(self.uid(), format!("payload is not UTF-8: {e}"))
                })?;
                PushPayload::Xml(XmlElement::parse(text)?)
            }
        };
        self.handle(&payload)
    }

    /// The error for a payload in a format this source does not read.
    fn unsupported(&self, format: PushFormat) -> SourceError {
        SourceError::UnsupportedFormat {
            source_uid: self.uid().to_string(),
            format,
        }
    }
}
