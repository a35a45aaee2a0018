//! Immutable key/value configuration shared by all sources.
//!
//! Keys follow the `PARK_API_*` naming of the environment variables they
//! usually come from. A flat TOML file can provide the same keys.

use std::collections::BTreeMap;
use std::path::Path;

use crate::SourceError;

/// Base path of local static template files.
pub const STATIC_GEOJSON_BASE_PATH: &str = "STATIC_GEOJSON_BASE_PATH";
/// Base URL of remote static template files.
pub const STATIC_GEOJSON_BASE_URL: &str = "STATIC_GEOJSON_BASE_URL";

/// String configuration values by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    values: BTreeMap<String, String>,
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every variable of the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::vars().collect()
    }

    /// Parses a flat TOML table. Scalars are stringified; nested tables
    /// and arrays are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Toml`] if the document is not valid TOML.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, SourceError> {
        let table: toml::Table = toml::from_str(toml_str)?;
        let mut values = BTreeMap::new();
        for (key, value) in table {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Datetime(dt) => dt.to_string(),
                toml::Value::Array(_) | toml::Value::Table(_) => {
                    log::warn!("Ignoring non-scalar config key {key}");
                    continue;
                }
            };
            values.insert(key, value);
        }
        Ok(Self { values })
    }

    /// Reads a flat TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be read or parsed.
    pub fn from_toml_file(path: &Path) -> Result<Self, SourceError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Sets a single key.
    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// Overlays `other` on top of `self`.
    #[must_use]
    pub fn merged(mut self, other: Self) -> Self {
        self.values.extend(other.values);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The value of a key a source cannot run without.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingConfig`] if the key is unset.
    pub fn require(&self, source_uid: &str, key: &str) -> Result<&str, SourceError> {
        self.get(key).ok_or_else(|| SourceError::MissingConfig {
            source_uid: source_uid.to_string(),
            keys: vec![key.to_string()],
        })
    }

    /// Which of `keys` are unset or empty.
    #[must_use]
    pub fn missing_keys(&self, keys: &[&str]) -> Vec<String> {
        keys.iter()
            .filter(|key| self.get(key).is_none_or(str::is_empty))
            .map(|key| (*key).to_string())
            .collect()
    }

    /// The upstream endpoint of a pull source: `PARK_API_<UID>_URL` when
    /// set, otherwise `default`.
    #[must_use]
    pub fn endpoint(&self, source_uid: &str, default: &str) -> String {
        let key = format!("PARK_API_{}_URL", source_uid.to_uppercase());
        self.get(&key).unwrap_or(default).trim_end_matches('/').to_string()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Config {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
