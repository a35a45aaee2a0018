//! Timestamp parsing variants, all normalized to UTC instants.
//!
//! Results carry second precision; sub-second parts are dropped the same
//! way the canonical model drops them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use parkapi_parking_models::value::{self, truncate_subsec};
use parkapi_parking_models::{FieldError, ReasonCode};
use serde_json::Value;

fn invalid(s: &str, reason: &str) -> FieldError {
    FieldError::new(ReasonCode::InvalidDatetime, reason).with_received(&Value::String(s.to_string()))
}

/// Parses ISO-like timestamps that use a space instead of `T` between date
/// and time (`"2024-04-01 12:13:14"`). Regular ISO 8601 strings are
/// accepted as well.
///
/// # Errors
///
/// Fails if the repaired string is not an ISO 8601 timestamp.
pub fn parse_spaced_datetime(s: &str) -> Result<DateTime<Utc>, FieldError> {
    let trimmed = s.trim();
    let repaired = if trimmed.as_bytes().get(10) == Some(&b' ') {
        format!("{}T{}", &trimmed[..10], &trimmed[11..])
    } else {
        trimmed.to_string()
    };
    value::datetime(&Value::String(repaired)).map_err(|_| invalid(s, "not a date-time"))
}

/// Parses an RFC 1123 HTTP date (`"Mon, 01 Apr 2024 12:13:14 GMT"`).
///
/// # Errors
///
/// Fails if the string is not an RFC 1123/2822 date.
pub fn parse_rfc1123(s: &str) -> Result<DateTime<Utc>, FieldError> {
    DateTime::parse_from_rfc2822(s.trim())
        .map(|dt| truncate_subsec(dt.with_timezone(&Utc)))
        .map_err(|_| invalid(s, "not an RFC 1123 date"))
}

/// Converts an epoch count to an instant. `divisor` is the number of units
/// per second (`1` for seconds, `1000` for milliseconds).
///
/// # Errors
///
/// Fails on non-integers, a non-positive divisor, and out-of-range values.
pub fn from_epoch(value: &Value, divisor: i64) -> Result<DateTime<Utc>, FieldError> {
    if divisor <= 0 {
        return Err(FieldError::new(
            ReasonCode::InvalidFormat,
            format!("epoch divisor must be positive, got {divisor}"),
        ));
    }
    let raw = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            #[allow(clippy::cast_possible_truncation)]
            n.as_f64().map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let Some(raw) = raw else {
        return Err(FieldError::invalid_type("epoch integer", value));
    };
    DateTime::from_timestamp(raw.div_euclid(divisor), 0).ok_or_else(|| {
        FieldError::new(ReasonCode::InvalidDatetime, "epoch value out of range")
            .with_received(value)
    })
}

/// Parses a date in `format` (chrono `strftime` syntax) as midnight UTC.
///
/// # Errors
///
/// Fails if `s` does not match `format`.
pub fn parse_date(s: &str, format: &str) -> Result<DateTime<Utc>, FieldError> {
    NaiveDate::parse_from_str(s.trim(), format)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| invalid(s, &format!("does not match date format {format}")))
}

/// Parses a date-time in `format` (chrono `strftime` syntax). Naive
/// results are taken as UTC.
///
/// # Errors
///
/// Fails if `s` does not match `format`.
pub fn parse_datetime(s: &str, format: &str) -> Result<DateTime<Utc>, FieldError> {
    let s_trimmed = s.trim();
    DateTime::parse_from_str(s_trimmed, format)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(s_trimmed, format).map(|n| n.and_utc()))
        .map(truncate_subsec)
        .map_err(|_| invalid(s, &format!("does not match date-time format {format}")))
}

/// Canonical string form of an instant (`2024-04-01T12:13:14Z`).
#[must_use]
pub fn to_canonical(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}
