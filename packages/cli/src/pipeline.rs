//! Pull and push runs over registered sources.
//!
//! A run checks configuration first, then invokes each selected source in
//! turn, pairs realtime with static data and hands the merged sites to
//! [`parkapi_output`]. A failing source is logged and left out; it never
//! stops the others.

use std::path::{Path, PathBuf};
use std::time::Instant;

use parkapi_output::{
    OutputError, OutputFormat, SiteMap, combined_document, document_path, merge_sites,
    source_document, write_document,
};
use parkapi_source::{ParkingSource, PullSource, PushSource, Source, SourceError, SourceRegistry};
use parkapi_source_models::{RecordError, SourceInfo};
use serde_json::Value;

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The merged result of one source.
#[derive(Debug)]
pub struct SourceResult {
    pub source: SourceInfo,
    pub sites: Vec<SiteMap>,
    pub errors: Vec<RecordError>,
}

impl SourceResult {
    fn log_summary(&self, started: Instant) {
        log::info!(
            "[{}] {} parking sites, {} errors in {:.1}s",
            self.source.uid,
            self.sites.len(),
            self.errors.len(),
            started.elapsed().as_secs_f64()
        );
    }
}

/// Where documents go.
#[derive(Debug, Clone)]
pub enum Destination {
    /// One `{uid}.{ext}` document per source.
    Directory(PathBuf),
    /// One combined document.
    File(PathBuf),
    /// One combined document on stdout.
    Stdout,
}

/// Fetches static and, if the source has any, realtime data of one pull
/// source.
///
/// # Errors
///
/// Returns [`SourceError`] if either fetch fails at source level.
pub async fn pull_source(source: &dyn PullSource) -> Result<SourceResult, PipelineError> {
    let started = Instant::now();
    let static_batch = source.get_static_sites().await?;
    let mut errors = static_batch.errors;

    let realtime_sites = if source.info().has_realtime_data {
        let realtime_batch = source.get_realtime_sites().await?;
        errors.extend(realtime_batch.errors);
        realtime_batch.items
    } else {
        Vec::new()
    };

    let result = SourceResult {
        source: source.info().clone(),
        sites: merge_sites(&static_batch.items, &realtime_sites)?,
        errors,
    };
    result.log_summary(started);
    Ok(result)
}

/// Pulls every pull source in `registry`, one after another.
///
/// Sources with missing configuration are reported up front and skipped,
/// as are sources whose fetch fails.
pub async fn pull_all(registry: &SourceRegistry) -> Vec<SourceResult> {
    let mut runnable = Vec::new();
    for source in registry.sources() {
        let Source::Pull(pull) = source else {
            continue;
        };
        match registry.check_config(source) {
            Ok(()) => runnable.push(pull.as_ref()),
            Err(e) => log::error!("{e}"),
        }
    }
    log::info!(
        "Pulling {} source(s): {}",
        runnable.len(),
        runnable
            .iter()
            .map(|source| source.uid())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut results = Vec::with_capacity(runnable.len());
    for source in runnable {
        match pull_source(source).await {
            Ok(result) => results.push(result),
            Err(e) => log::error!("Failed to pull {}: {e}", source.uid()),
        }
    }
    results
}

/// Runs a push source on a local payload file.
///
/// # Errors
///
/// Returns [`PipelineError`] if the file cannot be read or the payload is
/// rejected at source level.
pub fn push_file(source: &dyn PushSource, path: &Path) -> Result<SourceResult, PipelineError> {
    let started = Instant::now();
    let bytes = std::fs::read(path)?;
    let batch = source.handle_bytes(&bytes)?;
    let result = SourceResult {
        source: source.info().clone(),
        sites: merge_sites(&batch.static_sites, &batch.realtime_sites)?,
        errors: batch.errors,
    };
    result.log_summary(started);
    Ok(result)
}

/// Writes `results` to `destination`.
///
/// # Errors
///
/// Returns [`PipelineError`] if a document cannot be built or written.
pub fn write_results(
    results: Vec<SourceResult>,
    format: OutputFormat,
    destination: &Destination,
) -> Result<(), PipelineError> {
    match destination {
        Destination::Directory(directory) => {
            std::fs::create_dir_all(directory)?;
            for result in &results {
                let document = source_document(format, &result.source, &result.sites)?;
                write_document(&document_path(directory, &result.source.uid, format), &document)?;
            }
        }
        Destination::File(path) => {
            write_document(path, &combined(results, format)?)?;
        }
        Destination::Stdout => {
            let document = combined(results, format)?;
            println!("{document:#}");
        }
    }
    Ok(())
}

fn combined(
    results: Vec<SourceResult>,
    format: OutputFormat,
) -> Result<Value, PipelineError> {
    let sources: Vec<(SourceInfo, Vec<SiteMap>)> = results
        .into_iter()
        .map(|result| (result.source, result.sites))
        .collect();
    Ok(combined_document(format, &sources)?)
}

/// Prints every record-level error of `results`.
pub fn report_errors(results: &[SourceResult]) {
    for result in results {
        for error in &result.errors {
            eprintln!("{error}");
        }
    }
}
