//! Locale-aware decimal parsing.

use parkapi_parking_models::{FieldError, ReasonCode};
use serde_json::Value;

/// Parses a decimal that uses a comma as decimal separator (`"48,52"`).
///
/// Dot-separated input is accepted unchanged, so already normalized values
/// pass through.
///
/// # Errors
///
/// Fails if the cleaned string is not a finite number.
pub fn parse_german_decimal(s: &str) -> Result<f64, FieldError> {
    s.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| {
            FieldError::new(ReasonCode::InvalidFormat, "not a decimal number")
                .with_received(&Value::String(s.to_string()))
        })
}

/// [`parse_german_decimal`] over a JSON value. Numbers pass through.
///
/// # Errors
///
/// Fails on values that are neither numbers nor decimal strings.
pub fn german_decimal(value: &Value) -> Result<f64, FieldError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FieldError::invalid_type("number", value)),
        Value::String(s) => parse_german_decimal(s),
        _ => Err(FieldError::invalid_type("decimal string", value)),
    }
}
