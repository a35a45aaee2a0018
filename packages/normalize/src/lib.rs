#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Field normalizers for upstream parking feeds.
//!
//! Each normalizer is a single-purpose converter that either fully converts
//! its input or fails with a structured [`FieldError`]. They exist in two
//! forms: typed functions for hand-written adapters, and the serde-tagged
//! [`Normalizer`] enum that data-driven source definitions list per field.

pub mod blank;
pub mod boolean;
pub mod datetime;
pub mod decimal;
pub mod enum_map;
pub mod envelope;
pub mod geo;
pub mod opening_hours;
pub mod text;

use std::collections::BTreeMap;

use parkapi_parking_models::{FieldError, ReasonCode, value};
use serde::Deserialize;
use serde_json::{Number, Value};

pub use boolean::MappedBoolean;
pub use enum_map::{EnumMapping, EnumTable, EnumTarget, Unmapped};
pub use geo::UtmZone;

const fn default_divisor() -> i64 {
    1
}

/// A configurable value converter, applied to one raw field.
///
/// In TOML:
/// ```toml
/// [fields.has_fee]
/// column = "Gebührenpflichtig"
/// normalize = [
///     { type = "excel_blank" },
///     { type = "mapped_boolean", mapping = { ja = true, nein = false } },
/// ]
/// ```
///
/// `null` passes through every normalizer unchanged, so a chain stops
/// converting once a field has been found absent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Normalizer {
    /// Empty string, lone dash → `null`.
    ExcelBlank,
    /// Numeric zero → `null`.
    ZeroAsAbsent,
    /// Trims surrounding whitespace from strings.
    Trim,
    /// Comma decimal separator → number.
    GermanDecimal,
    /// Table-driven boolean.
    MappedBoolean(MappedBoolean),
    /// Table-driven canonical enum member.
    Enum(EnumMapping),
    /// `"YYYY-MM-DD HH:MM:SS"` → canonical timestamp.
    SpacedDatetime,
    /// RFC 1123 HTTP date → canonical timestamp.
    Rfc1123Datetime,
    /// Epoch integer → canonical timestamp.
    EpochTimestamp {
        /// Units per second.
        #[serde(default = "default_divisor")]
        divisor: i64,
    },
    /// Date in an explicit format → midnight UTC.
    ParsedDate {
        /// chrono `strftime` format.
        format: String,
    },
    /// Date-time in an explicit format → canonical timestamp.
    ParsedDatetime {
        /// chrono `strftime` format.
        format: String,
    },
    /// Ordered substring replacements.
    Replace {
        /// `[from, to]` pairs, applied in order.
        replacements: Vec<(String, String)>,
    },
    /// Number → its string form.
    NumberToString,
    /// Multiplies a number and rounds to an integer (unit conversion).
    Scale {
        /// Multiplier, e.g. `100` for meters to centimeters.
        factor: f64,
    },
    /// Splits a string into a list of trimmed, non-empty parts.
    Split {
        /// Separator between parts.
        separator: String,
    },
    /// Replaces whole values through a table (keys match case-insensitively
    /// on the value's string form). Unlisted values become `null`, or fail
    /// when `strict` is set.
    Lookup {
        mapping: BTreeMap<String, Value>,
        #[serde(default)]
        strict: bool,
    },
    /// `then` if the string contains `needle` (ignoring case), else `null`.
    Contains { needle: String, then: Value },
}

impl Normalizer {
    /// Converts `value`.
    ///
    /// # Errors
    ///
    /// Returns the normalizer's [`FieldError`] when the value cannot be
    /// converted.
    pub fn apply(&self, value: Value) -> Result<Value, FieldError> {
        if value.is_null() {
            return Ok(value);
        }
        match self {
            Self::ExcelBlank => Ok(blank::excel_blank(value)),
            Self::ZeroAsAbsent => Ok(blank::zero_as_absent(value)),
            Self::Trim => Ok(match value {
                Value::String(s) => Value::String(s.trim().to_string()),
                other => other,
            }),
            Self::GermanDecimal => decimal::german_decimal(&value).and_then(float_value),
            Self::MappedBoolean(mapped) => mapped.validate(&value).map(Value::Bool),
            Self::Enum(mapping) => mapping.apply(&value).map(Value::String),
            Self::SpacedDatetime => timestamp(&value, datetime::parse_spaced_datetime),
            Self::Rfc1123Datetime => timestamp(&value, datetime::parse_rfc1123),
            Self::EpochTimestamp { divisor } => datetime::from_epoch(&value, *divisor)
                .map(|dt| Value::String(datetime::to_canonical(dt))),
            Self::ParsedDate { format } => {
                timestamp(&value, |s| datetime::parse_date(s, format))
            }
            Self::ParsedDatetime { format } => {
                timestamp(&value, |s| datetime::parse_datetime(s, format))
            }
            Self::Replace { replacements } => match value {
                Value::String(s) => Ok(Value::String(text::replace_all(&s, replacements))),
                other => Err(FieldError::invalid_type("string", &other)),
            },
            Self::NumberToString => text::number_to_string(&value).map(Value::String),
            Self::Scale { factor } => scale(&value, *factor),
            Self::Split { separator } => match value {
                Value::String(s) => Ok(Value::Array(
                    s.split(separator.as_str())
                        .map(str::trim)
                        .filter(|part| !part.is_empty())
                        .map(|part| Value::String(part.to_string()))
                        .collect(),
                )),
                other => Err(FieldError::invalid_type("string", &other)),
            },
            Self::Lookup { mapping, strict } => lookup(mapping, *strict, &value),
            Self::Contains { needle, then } => match value {
                Value::String(s) if s.to_lowercase().contains(&needle.to_lowercase()) => {
                    Ok(then.clone())
                }
                Value::String(_) => Ok(Value::Null),
                other => Err(FieldError::invalid_type("string", &other)),
            },
        }
    }
}

/// Runs `value` through `normalizers` in order, stopping at the first
/// failure.
///
/// # Errors
///
/// Returns the first normalizer's [`FieldError`].
pub fn apply_chain(normalizers: &[Normalizer], value: Value) -> Result<Value, FieldError> {
    normalizers
        .iter()
        .try_fold(value, |acc, normalizer| normalizer.apply(acc))
}

fn timestamp(
    value: &Value,
    parse: impl FnOnce(&str) -> Result<chrono::DateTime<chrono::Utc>, FieldError>,
) -> Result<Value, FieldError> {
    let Some(s) = value.as_str() else {
        return Err(FieldError::invalid_type("string", value));
    };
    parse(s).map(|dt| Value::String(datetime::to_canonical(dt)))
}

fn float_value(n: f64) -> Result<Value, FieldError> {
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| FieldError::new(ReasonCode::InvalidFormat, "not a finite number"))
}

fn lookup(mapping: &BTreeMap<String, Value>, strict: bool, value: &Value) -> Result<Value, FieldError> {
    let key = match value {
        Value::String(s) => s.trim().to_lowercase(),
        Value::Number(_) | Value::Bool(_) => value.to_string(),
        _ => return Err(FieldError::invalid_type("scalar", value)),
    };
    if let Some((_, mapped)) = mapping.iter().find(|(k, _)| k.to_lowercase() == key) {
        return Ok(mapped.clone());
    }
    if strict {
        let allowed: Vec<&str> = mapping.keys().map(String::as_str).collect();
        return Err(FieldError::not_allowed(value, &allowed));
    }
    Ok(Value::Null)
}

#[allow(clippy::cast_possible_truncation)]
fn scale(value: &Value, factor: f64) -> Result<Value, FieldError> {
    let n = match value {
        Value::String(s) => decimal::parse_german_decimal(s)?,
        _ => value::as_number(value).ok_or_else(|| FieldError::invalid_type("number", value))?,
    };
    let scaled = (n * factor).round();
    if !scaled.is_finite() || scaled.abs() > 9.0e15 {
        return Err(
            FieldError::new(ReasonCode::AboveMaximum, "scaled value out of range")
                .with_received(value),
        );
    }
    Ok(Value::from(scaled as i64))
}
