//! Structured validation failures.
//!
//! A [`FieldError`] describes why one value was rejected. Once attached to
//! a field name it becomes a [`FieldViolation`], and a record that failed
//! validation carries all of its violations in one [`ValidationError`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

/// Machine-readable reason a value was rejected.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReasonCode {
    /// A required field is absent or null.
    Required,
    /// The value has the wrong JSON type.
    InvalidType,
    /// A number is smaller than the allowed minimum.
    BelowMinimum,
    /// A number is larger than the allowed maximum.
    AboveMaximum,
    /// A string is shorter than the allowed minimum length.
    TooShort,
    /// A string is longer than the allowed maximum length.
    TooLong,
    /// The value is not one of the allowed values.
    NotAllowedValue,
    /// The value could not be parsed in the expected format.
    InvalidFormat,
    /// The value is not an absolute http(s) URL.
    InvalidUrl,
    /// The value is not a recognizable timestamp.
    InvalidDatetime,
    /// One or more list items were rejected.
    InvalidListItem,
    /// Both coordinates are exactly zero.
    LatLonZero,
    /// `YES`/`NO` park-and-ride markers combined with other tags.
    InvalidParkAndRideCombination,
}

/// Rejection of a single value, before it is attributed to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code} ({reason})")]
pub struct FieldError {
    /// Machine-readable reason.
    pub code: ReasonCode,
    /// Human-readable explanation.
    pub reason: String,
    /// The offending input value, when there was one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<Value>,
}

impl FieldError {
    /// Creates a new error without a received value.
    #[must_use]
    pub fn new(code: ReasonCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            received: None,
        }
    }

    /// Attaches the rejected input value.
    #[must_use]
    pub fn with_received(mut self, received: &Value) -> Self {
        self.received = Some(received.clone());
        self
    }

    #[must_use]
    pub fn required() -> Self {
        Self::new(ReasonCode::Required, "field is required")
    }

    /// The value is of the wrong JSON type.
    #[must_use]
    pub fn invalid_type(expected: &str, received: &Value) -> Self {
        Self::new(
            ReasonCode::InvalidType,
            format!("expected {expected}, got {}", json_type_name(received)),
        )
        .with_received(received)
    }

    /// The value is not among `allowed`.
    #[must_use]
    pub fn not_allowed(received: &Value, allowed: &[&str]) -> Self {
        Self::new(
            ReasonCode::NotAllowedValue,
            format!("expected one of {}", allowed.join(", ")),
        )
        .with_received(received)
    }

    /// Attributes this error to `field`.
    #[must_use]
    pub fn at(self, field: impl Into<String>) -> FieldViolation {
        FieldViolation {
            field: Some(field.into()),
            code: self.code,
            reason: self.reason,
            received: self.received,
        }
    }

    /// Turns this error into a record-level violation that spans several
    /// fields.
    #[must_use]
    pub fn on_record(self) -> FieldViolation {
        FieldViolation {
            field: None,
            code: self.code,
            reason: self.reason,
            received: self.received,
        }
    }
}

/// A [`FieldError`] attributed to a field, or to the whole record when
/// `field` is `None` (cross-field rules).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldViolation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub code: ReasonCode,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<Value>,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {} ({})", self.code, self.reason),
            None => write!(f, "{} ({})", self.code, self.reason),
        }
    }
}

/// Every defect found in one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("validation failed: {}", summarize(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    #[must_use]
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    /// Wraps a single violation.
    #[must_use]
    pub fn single(violation: FieldViolation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    /// Whether `field` has a violation with `code`.
    #[must_use]
    pub fn has(&self, field: &str, code: ReasonCode) -> bool {
        self.violations
            .iter()
            .any(|v| v.field.as_deref() == Some(field) && v.code == code)
    }

    /// Whether any violation carries `code`, regardless of field.
    #[must_use]
    pub fn has_code(&self, code: ReasonCode) -> bool {
        self.violations.iter().any(|v| v.code == code)
    }

    /// Names of all fields with at least one violation.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().filter_map(|v| v.field.as_deref())
    }
}

impl From<FieldViolation> for ValidationError {
    fn from(violation: FieldViolation) -> Self {
        Self::single(violation)
    }
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Short JSON type name used in error messages.
#[must_use]
pub const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reason_codes_are_snake_case() {
        assert_eq!(ReasonCode::BelowMinimum.to_string(), "below_minimum");
        assert_eq!(
            serde_json::to_value(ReasonCode::LatLonZero).unwrap(),
            json!("lat_lon_zero")
        );
    }

    #[test]
    fn display_lists_every_violation() {
        let error = ValidationError::new(vec![
            FieldError::required().at("uid"),
            FieldError::new(ReasonCode::LatLonZero, "both coordinates are zero").on_record(),
        ]);
        assert_eq!(
            error.to_string(),
            "validation failed: uid: required (field is required); lat_lon_zero (both coordinates are zero)"
        );
    }

    #[test]
    fn invalid_type_names_received_type() {
        let error = FieldError::invalid_type("string", &json!(5));
        assert_eq!(error.code, ReasonCode::InvalidType);
        assert_eq!(error.reason, "expected string, got number");
        assert_eq!(error.received, Some(json!(5)));
    }
}
