#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Output documents for imported parking sites.
//!
//! Static sites and their realtime snapshots are paired by uid into flat
//! site mappings, which are then written either as a per-source JSON
//! document (`{"source": ..., "parking_sites": [...]}`) or as a GeoJSON
//! `FeatureCollection` with one point feature per site.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use parkapi_parking_models::{RealtimeSite, StaticSite};
use parkapi_source_models::SourceInfo;
use serde::Serialize;
use serde_json::{Map, Value};
use strum_macros::{AsRefStr, Display, EnumString};

/// Errors that can occur while building or writing output documents.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing the document failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A merged site has no usable coordinates.
    #[error("site {0} has no coordinates")]
    MissingCoordinates(String),
}

/// Document encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Geojson,
}

impl OutputFormat {
    /// File extension of documents in this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Geojson => "geojson",
        }
    }
}

/// A static site with its realtime fields merged in.
pub type SiteMap = Map<String, Value>;

/// Pairs realtime snapshots with static sites by uid.
///
/// Every static site yields one mapping, in input order. Snapshots whose
/// uid has no static counterpart are dropped.
///
/// # Errors
///
/// Returns [`OutputError::Json`] if a record cannot be serialized.
pub fn merge_sites(
    static_sites: &[StaticSite],
    realtime_sites: &[RealtimeSite],
) -> Result<Vec<SiteMap>, OutputError> {
    let mut realtime_by_uid: BTreeMap<&str, &RealtimeSite> = realtime_sites
        .iter()
        .map(|site| (site.uid.as_str(), site))
        .collect();

    let mut merged = Vec::with_capacity(static_sites.len());
    for site in static_sites {
        let mut map = to_object(site)?;
        if let Some(realtime) = realtime_by_uid.remove(site.uid.as_str()) {
            let mut fields = to_object(realtime)?;
            fields.remove("uid");
            map.extend(fields);
        }
        merged.push(map);
    }

    if !realtime_by_uid.is_empty() {
        log::warn!(
            "Dropping {} realtime sites without static data: {}",
            realtime_by_uid.len(),
            realtime_by_uid.keys().copied().collect::<Vec<_>>().join(", ")
        );
    }
    Ok(merged)
}

fn to_object(record: &impl Serialize) -> Result<SiteMap, OutputError> {
    Ok(serde_json::from_value(serde_json::to_value(record)?)?)
}

// ── JSON ─────────────────────────────────────────────────────────────────

/// The flat per-source document.
#[derive(Debug, Clone, Serialize)]
pub struct SourceDocument<'a> {
    pub source: &'a SourceInfo,
    pub parking_sites: &'a [SiteMap],
}

/// Builds the flat JSON document of one source.
///
/// # Errors
///
/// Returns [`OutputError::Json`] if the document cannot be serialized.
pub fn json_document(source: &SourceInfo, sites: &[SiteMap]) -> Result<Value, OutputError> {
    Ok(serde_json::to_value(SourceDocument {
        source,
        parking_sites: sites,
    })?)
}

// ── GeoJSON ──────────────────────────────────────────────────────────────

fn coordinate(site: &SiteMap, key: &str) -> Option<f64> {
    site.get(key).and_then(Value::as_f64)
}

/// One point feature; properties are the site fields plus the `source`
/// block.
///
/// # Errors
///
/// Returns [`OutputError`] if the site has no `lat`/`lon`.
pub fn site_feature(source: &SourceInfo, site: &SiteMap) -> Result<Feature, OutputError> {
    let (Some(lat), Some(lon)) = (coordinate(site, "lat"), coordinate(site, "lon")) else {
        let uid = site.get("uid").and_then(Value::as_str).unwrap_or_default();
        return Err(OutputError::MissingCoordinates(uid.to_string()));
    };
    let mut properties: JsonObject = site.clone();
    properties.insert("source".to_string(), serde_json::to_value(source)?);

    Ok(Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::Point(vec![lon, lat]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Builds a `FeatureCollection` over the sites of any number of sources.
///
/// # Errors
///
/// Returns [`OutputError`] if a site cannot become a feature.
pub fn feature_collection<'a>(
    documents: impl IntoIterator<Item = (&'a SourceInfo, &'a [SiteMap])>,
) -> Result<FeatureCollection, OutputError> {
    let mut features = Vec::new();
    for (source, sites) in documents {
        for site in sites {
            features.push(site_feature(source, site)?);
        }
    }
    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

// ── Writing ──────────────────────────────────────────────────────────────

/// Builds the document of one source in `format`.
///
/// # Errors
///
/// Returns [`OutputError`] if the document cannot be built.
pub fn source_document(
    format: OutputFormat,
    source: &SourceInfo,
    sites: &[SiteMap],
) -> Result<Value, OutputError> {
    match format {
        OutputFormat::Json => json_document(source, sites),
        OutputFormat::Geojson => Ok(serde_json::to_value(feature_collection([(source, sites)])?)?),
    }
}

/// Builds a single document over several sources: a list of per-source
/// documents for JSON, one merged `FeatureCollection` for GeoJSON.
///
/// # Errors
///
/// Returns [`OutputError`] if the document cannot be built.
pub fn combined_document(
    format: OutputFormat,
    sources: &[(SourceInfo, Vec<SiteMap>)],
) -> Result<Value, OutputError> {
    match format {
        OutputFormat::Json => Ok(Value::Array(
            sources
                .iter()
                .map(|(source, sites)| json_document(source, sites))
                .collect::<Result<_, _>>()?,
        )),
        OutputFormat::Geojson => Ok(serde_json::to_value(feature_collection(
            sources
                .iter()
                .map(|(source, sites)| (source, sites.as_slice())),
        )?)?),
    }
}

/// `directory/{uid}.{extension}`.
#[must_use]
pub fn document_path(directory: &Path, source_uid: &str, format: OutputFormat) -> PathBuf {
    directory.join(format!("{source_uid}.{}", format.extension()))
}

/// Writes `document` as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`OutputError`] if the file cannot be written.
pub fn write_document(path: &Path, document: &Value) -> Result<(), OutputError> {
    let mut bytes = serde_json::to_vec_pretty(document)?;
    bytes.push(b'\n');
    std::fs::write(path, bytes)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}
