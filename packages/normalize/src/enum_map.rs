//! Explicit translation tables from upstream vocabularies to canonical
//! enums.
//!
//! Every table declares what happens to values it does not list: either
//! they are rejected, or they degrade to a declared fallback member.
//! Nothing is ever silently dropped.

use std::collections::BTreeMap;
use std::str::FromStr;

use parkapi_parking_models::{
    ExternalIdentifierType, FieldError, OpeningStatus, ParkAndRideType, ParkingSiteType,
    PurposeType, SupervisionType,
};
use serde::Deserialize;
use serde_json::Value;
use strum::VariantNames;
use strum_macros::{AsRefStr, Display, EnumString};

/// Behavior for values missing from a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unmapped<E> {
    /// Fail with a `not_allowed_value` error.
    Reject,
    /// Degrade to this member.
    Fallback(E),
}

/// A typed translation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumTable<E> {
    entries: BTreeMap<String, E>,
    case_insensitive: bool,
    unmapped: Unmapped<E>,
}

impl<E: Clone> EnumTable<E> {
    /// Builds a case-sensitive table.
    pub fn new<K: AsRef<str>>(
        entries: impl IntoIterator<Item = (K, E)>,
        unmapped: Unmapped<E>,
    ) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_string(), v))
                .collect(),
            case_insensitive: false,
            unmapped,
        }
    }

    /// Matches keys ignoring case.
    #[must_use]
    pub fn case_insensitive(mut self) -> Self {
        self.entries = self
            .entries
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        self.case_insensitive = true;
        self
    }

    fn lookup(&self, raw: &str) -> Option<&E> {
        let raw = raw.trim();
        if self.case_insensitive {
            self.entries.get(&raw.to_lowercase())
        } else {
            self.entries.get(raw)
        }
    }

    /// Translates `raw`.
    ///
    /// # Errors
    ///
    /// Fails if `raw` is not listed and the table rejects unmapped values.
    pub fn map(&self, raw: &str) -> Result<E, FieldError> {
        if let Some(mapped) = self.lookup(raw) {
            return Ok(mapped.clone());
        }
        match &self.unmapped {
            Unmapped::Fallback(fallback) => Ok(fallback.clone()),
            Unmapped::Reject => {
                let allowed: Vec<&str> = self.entries.keys().map(String::as_str).collect();
                Err(FieldError::not_allowed(
                    &Value::String(raw.to_string()),
                    &allowed,
                ))
            }
        }
    }

    /// Translates a JSON value. Numbers are looked up by their string form.
    ///
    /// # Errors
    ///
    /// Fails on non-scalar values and on rejected unmapped values.
    pub fn map_value(&self, value: &Value) -> Result<E, FieldError> {
        match value {
            Value::String(s) => self.map(s),
            Value::Number(n) => self.map(&n.to_string()),
            _ => Err(FieldError::invalid_type("string", value)),
        }
    }
}

/// Canonical enums a configured table may translate into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EnumTarget {
    ParkingSiteType,
    PurposeType,
    ParkAndRideType,
    SupervisionType,
    OpeningStatus,
    ExternalIdentifierType,
}

impl EnumTarget {
    /// Serialized names of the target's members.
    #[must_use]
    pub const fn variants(self) -> &'static [&'static str] {
        match self {
            Self::ParkingSiteType => ParkingSiteType::VARIANTS,
            Self::PurposeType => PurposeType::VARIANTS,
            Self::ParkAndRideType => ParkAndRideType::VARIANTS,
            Self::SupervisionType => SupervisionType::VARIANTS,
            Self::OpeningStatus => OpeningStatus::VARIANTS,
            Self::ExternalIdentifierType => ExternalIdentifierType::VARIANTS,
        }
    }

    /// Whether `name` is a member of the target.
    #[must_use]
    pub fn accepts(self, name: &str) -> bool {
        match self {
            Self::ParkingSiteType => ParkingSiteType::from_str(name).is_ok(),
            Self::PurposeType => PurposeType::from_str(name).is_ok(),
            Self::ParkAndRideType => ParkAndRideType::from_str(name).is_ok(),
            Self::SupervisionType => SupervisionType::from_str(name).is_ok(),
            Self::OpeningStatus => OpeningStatus::from_str(name).is_ok(),
            Self::ExternalIdentifierType => ExternalIdentifierType::from_str(name).is_ok(),
        }
    }
}

/// How a configured table handles unlisted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnUnmapped {
    Reject,
    Fallback,
}

/// Load-time problems with a configured table.
#[derive(Debug, thiserror::Error)]
pub enum EnumMappingError {
    /// A table entry maps to something that is not a member of the target.
    #[error("{target}: '{upstream}' maps to unknown member '{member}'")]
    UnknownMember {
        target: EnumTarget,
        upstream: String,
        member: String,
    },
    /// `on_unmapped = "fallback"` without a `fallback` member.
    #[error("{target}: on_unmapped = fallback requires a fallback member")]
    MissingFallback { target: EnumTarget },
    /// A `fallback` member given while unmapped values are rejected.
    #[error("{target}: fallback '{member}' is unreachable with on_unmapped = reject")]
    UnreachableFallback { target: EnumTarget, member: String },
    /// Two entries collide once case is ignored.
    #[error("{target}: entries collide when ignoring case: '{upstream}'")]
    CaseCollision { target: EnumTarget, upstream: String },
}

/// A translation table declared in a source definition.
///
/// ```toml
/// type = "enum"
/// target = "parking_site_type"
/// on_unmapped = "fallback"
/// fallback = "OTHER"
/// mapping = { parkhaus = "CAR_PARK", tiefgarage = "UNDERGROUND" }
/// ```
///
/// The table is checked when it is deserialized: every mapped member and
/// the fallback must exist in the target enum.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "EnumMappingConfig")]
pub struct EnumMapping {
    target: EnumTarget,
    table: EnumTable<String>,
}

#[derive(Deserialize)]
struct EnumMappingConfig {
    target: EnumTarget,
    mapping: BTreeMap<String, String>,
    on_unmapped: OnUnmapped,
    #[serde(default)]
    fallback: Option<String>,
    #[serde(default)]
    case_insensitive: bool,
}

impl TryFrom<EnumMappingConfig> for EnumMapping {
    type Error = EnumMappingError;

    fn try_from(config: EnumMappingConfig) -> Result<Self, Self::Error> {
        let target = config.target;
        for (upstream, member) in &config.mapping {
            if !target.accepts(member) {
                return Err(EnumMappingError::UnknownMember {
                    target,
                    upstream: upstream.clone(),
                    member: member.clone(),
                });
            }
        }

        let unmapped = match (config.on_unmapped, config.fallback) {
            (OnUnmapped::Reject, None) => Unmapped::Reject,
            (OnUnmapped::Reject, Some(member)) => {
                return Err(EnumMappingError::UnreachableFallback { target, member });
            }
            (OnUnmapped::Fallback, None) => {
                return Err(EnumMappingError::MissingFallback { target });
            }
            (OnUnmapped::Fallback, Some(member)) => {
                if !target.accepts(&member) {
                    return Err(EnumMappingError::UnknownMember {
                        target,
                        upstream: "<fallback>".to_string(),
                        member,
                    });
                }
                Unmapped::Fallback(member)
            }
        };

        if config.case_insensitive {
            let mut seen = std::collections::BTreeSet::new();
            for upstream in config.mapping.keys() {
                if !seen.insert(upstream.to_lowercase()) {
                    return Err(EnumMappingError::CaseCollision {
                        target,
                        upstream: upstream.clone(),
                    });
                }
            }
        }

        let mut table = EnumTable::new(config.mapping, unmapped);
        if config.case_insensitive {
            table = table.case_insensitive();
        }
        Ok(Self { target, table })
    }
}

impl EnumMapping {
    #[must_use]
    pub const fn target(&self) -> EnumTarget {
        self.target
    }

    /// Translates `value` to the canonical member name.
    ///
    /// # Errors
    ///
    /// Fails on rejected unmapped values.
    pub fn apply(&self, value: &Value) -> Result<String, FieldError> {
        self.table.map_value(value)
    }
}
