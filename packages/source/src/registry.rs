//! Source registry: every shipped adapter under its uid.
//!
//! Data-driven push sources are `.toml` files in `packages/source/sources/`,
//! baked into the binary at compile time via [`include_str!`]. Adding one is
//! as simple as creating a new TOML file and adding it to the list below.
//! Hand-written adapters are constructed in [`SourceRegistry::new`].

use std::collections::BTreeMap;

use parkapi_scraper::HttpClient;
use parkapi_source_models::SourceInfo;

use crate::source_def::{SourceDefinition, parse_source_toml};
use crate::sources::bahn_v2::BahnV2Source;
use crate::sources::heidelberg::HeidelbergSource;
use crate::sources::karlsruhe::KarlsruheSource;
use crate::sources::kienzler::KienzlerSource;
use crate::sources::mannheim::MannheimSource;
use crate::sources::parkapi_json::ParkApiJsonSource;
use crate::sources::ulm::UlmSource;
use crate::{Config, PullSource, PushSource, SourceError};

/// TOML configs embedded at compile time.
const SOURCE_TOMLS: &[(&str, &str)] = &[
    // ── CSV ──────────────────────────────────────────────────────────
    ("neckarsulm", include_str!("../sources/neckarsulm.toml")),
    ("reutlingen", include_str!("../sources/reutlingen.toml")),
    ("vrn", include_str!("../sources/vrn.toml")),
    // ── JSON ─────────────────────────────────────────────────────────
    ("pforzheim", include_str!("../sources/pforzheim.toml")),
    // ── XLSX ─────────────────────────────────────────────────────────
    ("ellwangen", include_str!("../sources/ellwangen.toml")),
    // ── XML ──────────────────────────────────────────────────────────
    ("stuttgart", include_str!("../sources/stuttgart.toml")),
];

/// Total number of data-driven sources (used in tests).
#[cfg(test)]
const EXPECTED_DEFINITION_COUNT: usize = 6;

/// Returns all data-driven source definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_definitions() -> Vec<SourceDefinition> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_source_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// A registered adapter in one of its two roles.
pub enum Source {
    Pull(Box<dyn PullSource>),
    Push(Box<dyn PushSource>),
}

impl Source {
    #[must_use]
    pub fn info(&self) -> &SourceInfo {
        match self {
            Self::Pull(source) => source.info(),
            Self::Push(source) => source.info(),
        }
    }

    #[must_use]
    pub fn required_config_keys(&self) -> &[&'static str] {
        match self {
            Self::Pull(source) => source.required_config_keys(),
            Self::Push(source) => source.required_config_keys(),
        }
    }

    /// `"pull"` or `"push"`.
    #[must_use]
    pub const fn role(&self) -> &'static str {
        match self {
            Self::Pull(_) => "pull",
            Self::Push(_) => "push",
        }
    }
}

/// Which sources a registry holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryFilter {
    /// Only these uids. `None` keeps every source.
    pub uids: Option<Vec<String>>,
    /// Drop push sources.
    pub pull_only: bool,
    /// Drop pull sources.
    pub push_only: bool,
}

impl RegistryFilter {
    fn keeps(&self, source: &Source) -> bool {
        match source {
            Source::Pull(_) => !self.push_only,
            Source::Push(_) => !self.pull_only,
        }
    }
}

/// Adapters by uid, sharing one [`Config`] and one [`HttpClient`].
pub struct SourceRegistry {
    config: Config,
    sources: BTreeMap<String, Source>,
}

impl SourceRegistry {
    /// Builds every shipped adapter.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Scrape`] if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, SourceError> {
        let client = HttpClient::new()?;
        let mut sources: Vec<Source> = vec![
            Source::Pull(Box::new(BahnV2Source::new(config.clone(), client.clone()))),
            Source::Pull(Box::new(HeidelbergSource::new(config.clone(), client.clone()))),
            Source::Pull(Box::new(KarlsruheSource::new(&config, client.clone()))),
            Source::Pull(Box::new(KienzlerSource::new(config.clone(), client.clone()))),
            Source::Pull(Box::new(MannheimSource::new(config.clone(), client.clone()))),
            Source::Pull(Box::new(UlmSource::new(config.clone(), client))),
            Source::Push(Box::new(ParkApiJsonSource::new())),
        ];
        sources.extend(
            all_definitions()
                .into_iter()
                .map(|definition| Source::Push(Box::new(definition))),
        );

        let sources = sources
            .into_iter()
            .map(|source| (source.info().uid.clone(), source))
            .collect();
        Ok(Self { config, sources })
    }

    /// Builds the adapters `filter` selects.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UnknownSource`] for a requested uid that is
    /// not registered, or any error of [`SourceRegistry::new`].
    pub fn with_filter(config: Config, filter: &RegistryFilter) -> Result<Self, SourceError> {
        let mut registry = Self::new(config)?;
        if let Some(uids) = &filter.uids {
            if let Some(unknown) = uids.iter().find(|uid| !registry.sources.contains_key(*uid)) {
                return Err(SourceError::UnknownSource(unknown.clone()));
            }
            registry.sources.retain(|uid, _| uids.contains(uid));
        }
        registry.sources.retain(|_, source| filter.keeps(source));
        Ok(registry)
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Registered uids in order.
    pub fn uids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// All registered sources in uid order.
    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.values()
    }

    /// Metadata of every registered source in uid order.
    #[must_use]
    pub fn infos(&self) -> Vec<&SourceInfo> {
        self.sources.values().map(Source::info).collect()
    }

    /// The source registered under `uid`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UnknownSource`] if there is none.
    pub fn get(&self, uid: &str) -> Result<&Source, SourceError> {
        self.sources
            .get(uid)
            .ok_or_else(|| SourceError::UnknownSource(uid.to_string()))
    }

    /// Fails with [`SourceError::MissingConfig`] listing every required
    /// key of `source` that is unset.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn check_config(&self, source: &Source) -> Result<(), SourceError> {
        let missing = self.config.missing_keys(source.required_config_keys());
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SourceError::MissingConfig {
                source_uid: source.info().uid.clone(),
                keys: missing,
            })
        }
    }

    /// The pull source `uid`, with its configuration checked.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the uid is unknown, names a push source,
    /// or misses required config keys.
    pub fn pull(&self, uid: &str) -> Result<&dyn PullSource, SourceError> {
        let source = self.get(uid)?;
        self.check_config(source)?;
        match source {
            Source::Pull(source) => Ok(source.as_ref()),
            Source::Push(_) => Err(SourceError::WrongRole {
                source_uid: uid.to_string(),
                expected: "pull",
            }),
        }
    }

    /// The push source `uid`, with its configuration checked.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the uid is unknown, names a pull source,
    /// or misses required config keys.
    pub fn push(&self, uid: &str) -> Result<&dyn PushSource, SourceError> {
        let source = self.get(uid)?;
        self.check_config(source)?;
        match source {
            Source::Push(source) => Ok(source.as_ref()),
            Source::Pull(_) => Err(SourceError::WrongRole {
                source_uid: uid.to_string(),
                expected: "push",
            }),
        }
    }
}
