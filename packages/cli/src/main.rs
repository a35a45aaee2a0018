#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `parkapi`: pull parking data from upstream sources, or run a push
//! source on a local payload, and write canonical JSON or GeoJSON.
//!
//! Configuration comes from the process environment, overlaid by an
//! optional flat TOML file (`--config`). Set `RUST_LOG` to control log
//! output.

mod pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use parkapi_output::OutputFormat;
use parkapi_source::config::STATIC_GEOJSON_BASE_PATH;
use parkapi_source::{Config, RegistryFilter, SourceRegistry};

use crate::pipeline::{Destination, pull_all, push_file, report_errors, write_results};

#[derive(Parser)]
#[command(name = "parkapi", about = "Parking data source importer")]
struct Cli {
    /// Flat TOML file with config keys, overriding the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum OutputType {
    #[default]
    Json,
    Geojson,
}

impl From<OutputType> for OutputFormat {
    fn from(value: OutputType) -> Self {
        match value {
            OutputType::Json => Self::Json,
            OutputType::Geojson => Self::Geojson,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch static and realtime data from pull sources
    Pull {
        /// Source uid to pull; repeatable. All pull sources if omitted.
        #[arg(long = "source")]
        sources: Vec<String>,
        /// Output encoding
        #[arg(long = "type", value_enum, default_value_t)]
        output_type: OutputType,
        /// Write one document per source into this directory
        #[arg(long, conflicts_with = "file")]
        directory: Option<PathBuf>,
        /// Write a single combined document to this file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Read static templates from this directory instead of the
        /// remote repository
        #[arg(long)]
        geojson_template_directory: Option<PathBuf>,
    },
    /// Run a push source on a local payload file
    Push {
        /// Push source uid (e.g., "`neckarsulm`")
        #[arg(long)]
        source: String,
        /// Payload in the source's declared format
        #[arg(long)]
        file: PathBuf,
        /// Output encoding
        #[arg(long = "type", value_enum, default_value_t)]
        output_type: OutputType,
        /// Write the document here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List all registered sources
    Sources,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = Config::from_env();
    Ok(match path {
        Some(path) => config.merged(Config::from_toml_file(path)?),
        None => config,
    })
}

fn destination(directory: Option<PathBuf>, file: Option<PathBuf>) -> Destination {
    match (directory, file) {
        (Some(directory), _) => Destination::Directory(directory),
        (None, Some(file)) => Destination::File(file),
        (None, None) => Destination::Stdout,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Sources => {
            let registry = SourceRegistry::new(config)?;
            println!("{:<16} {:<6} NAME", "UID", "ROLE");
            println!("{}", "-".repeat(60));
            for source in registry.sources() {
                println!("{:<16} {:<6} {}", source.info().uid, source.role(), source.info().name);
            }
        }
        Commands::Pull {
            sources,
            output_type,
            directory,
            file,
            geojson_template_directory,
        } => {
            if let Some(templates) = geojson_template_directory {
                config = config.with(STATIC_GEOJSON_BASE_PATH, &templates.to_string_lossy());
            }
            let filter = RegistryFilter {
                uids: (!sources.is_empty()).then_some(sources),
                pull_only: true,
                push_only: false,
            };
            let registry = SourceRegistry::with_filter(config, &filter)?;
            let results = pull_all(&registry).await;
            report_errors(&results);
            write_results(results, output_type.into(), &destination(directory, file))?;
        }
        Commands::Push {
            source,
            file,
            output_type,
            output,
        } => {
            let registry = SourceRegistry::new(config)?;
            let result = push_file(registry.push(&source)?, &file)?;
            let results = vec![result];
            report_errors(&results);
            write_results(results, output_type.into(), &destination(None, output))?;
        }
    }

    Ok(())
}
