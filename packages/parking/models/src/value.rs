//! Standard coercions from loosely typed JSON values.
//!
//! These are the checks the canonical record constructors apply to each
//! field. Source-specific conversions (German decimals, mapped booleans,
//! spreadsheet blanks, ...) live in the normalizer crate and run before
//! these.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use regex::Regex;
use serde_json::Value;
use strum::VariantNames;

use crate::validation::{FieldError, ReasonCode};

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^\s/?#@]+(:\d+)?([/?#]\S*)?$").unwrap_or_else(|e| panic!("{e}"))
});

/// A string whose length in characters is within `min_len..=max_len`.
///
/// # Errors
///
/// Fails on non-string values and on length violations.
pub fn string(value: &Value, min_len: usize, max_len: usize) -> Result<String, FieldError> {
    let Some(s) = value.as_str() else {
        return Err(FieldError::invalid_type("string", value));
    };
    let len = s.chars().count();
    if len < min_len {
        return Err(FieldError::new(
            ReasonCode::TooShort,
            format!("length {len} is below minimum {min_len}"),
        )
        .with_received(value));
    }
    if len > max_len {
        return Err(FieldError::new(
            ReasonCode::TooLong,
            format!("length {len} exceeds maximum {max_len}"),
        )
        .with_received(value));
    }
    Ok(s.to_string())
}

/// An absolute `http`/`https` URL of at most `max_len` characters.
///
/// # Errors
///
/// Fails on non-string values, overlong strings and malformed URLs.
pub fn url(value: &Value, max_len: usize) -> Result<String, FieldError> {
    let s = string(value, 1, max_len)?;
    if !URL_RE.is_match(&s) {
        return Err(
            FieldError::new(ReasonCode::InvalidUrl, "not an absolute http(s) URL")
                .with_received(value),
        );
    }
    Ok(s)
}

/// Reads a JSON number or a numeric string as `f64`.
#[must_use]
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// A number within `min..=max`. Numeric strings are accepted.
///
/// # Errors
///
/// Fails on non-numeric values and on range violations.
pub fn number(value: &Value, min: f64, max: f64) -> Result<f64, FieldError> {
    let Some(n) = as_number(value) else {
        return Err(FieldError::invalid_type("number", value));
    };
    if n < min {
        return Err(
            FieldError::new(ReasonCode::BelowMinimum, format!("{n} is below minimum {min}"))
                .with_received(value),
        );
    }
    if n > max {
        return Err(
            FieldError::new(ReasonCode::AboveMaximum, format!("{n} exceeds maximum {max}"))
                .with_received(value),
        );
    }
    Ok(n)
}

/// An integer. JSON integers and integer strings are accepted; fractional
/// numbers are not.
///
/// # Errors
///
/// Fails if the value is not an integer.
pub fn integer(value: &Value) -> Result<i64, FieldError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| FieldError::invalid_type("integer", value)),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            FieldError::new(ReasonCode::InvalidFormat, "not an integer").with_received(value)
        }),
        _ => Err(FieldError::invalid_type("integer", value)),
    }
}

/// A non-negative integer that fits into `u32` (capacities, lengths in
/// centimeters, durations in seconds).
///
/// # Errors
///
/// Fails on non-integers, negative values and values beyond `u32::MAX`.
pub fn non_negative(value: &Value) -> Result<u32, FieldError> {
    let n = integer(value)?;
    if n < 0 {
        return Err(
            FieldError::new(ReasonCode::BelowMinimum, format!("{n} is below minimum 0"))
                .with_received(value),
        );
    }
    u32::try_from(n).map_err(|_| {
        FieldError::new(
            ReasonCode::AboveMaximum,
            format!("{n} exceeds maximum {}", u32::MAX),
        )
        .with_received(value)
    })
}

/// A boolean. Besides JSON booleans, the strings `true`/`false` are
/// accepted case-insensitively.
///
/// # Errors
///
/// Fails on any other value.
pub fn boolean(value: &Value) -> Result<bool, FieldError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        Value::String(_) => Err(FieldError::not_allowed(value, &["true", "false"])),
        _ => Err(FieldError::invalid_type("boolean", value)),
    }
}

/// A timestamp as an absolute UTC instant with sub-second precision
/// discarded.
///
/// RFC 3339 strings with any offset are converted to UTC. Strings without
/// an offset are taken as UTC.
///
/// # Errors
///
/// Fails on non-strings and unparseable timestamps.
pub fn datetime(value: &Value) -> Result<DateTime<Utc>, FieldError> {
    let Some(s) = value.as_str() else {
        return Err(FieldError::invalid_type("string", value));
    };
    parse_datetime(s.trim()).ok_or_else(|| {
        FieldError::new(ReasonCode::InvalidDatetime, "not an ISO 8601 timestamp")
            .with_received(value)
    })
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc()))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").map(|n| n.and_utc()))
        .ok()?;
    Some(truncate_subsec(parsed))
}

/// Drops sub-second precision from `dt`.
#[must_use]
pub fn truncate_subsec(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// One of the variants of a strum-derived enum, by its serialized name.
///
/// # Errors
///
/// Fails on non-strings and unknown names, listing the allowed names.
pub fn enumeration<E>(value: &Value) -> Result<E, FieldError>
where
    E: FromStr + VariantNames,
{
    let Some(s) = value.as_str() else {
        return Err(FieldError::invalid_type("string", value));
    };
    E::from_str(s).map_err(|_| FieldError::not_allowed(value, E::VARIANTS))
}

/// A list whose items each pass `item`.
///
/// Every item is checked; the error names each rejected index.
///
/// # Errors
///
/// Fails on non-arrays and if any item is rejected.
pub fn list<T>(
    value: &Value,
    item: impl Fn(&Value) -> Result<T, FieldError>,
) -> Result<Vec<T>, FieldError> {
    let Some(items) = value.as_array() else {
        return Err(FieldError::invalid_type("array", value));
    };

    let mut parsed = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    for (index, raw) in items.iter().enumerate() {
        match item(raw) {
            Ok(v) => parsed.push(v),
            Err(e) => rejected.push(format!("[{index}] {e}")),
        }
    }

    if rejected.is_empty() {
        Ok(parsed)
    } else {
        Err(FieldError::new(ReasonCode::InvalidListItem, rejected.join(", ")).with_received(value))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ParkingSiteType;

    #[test]
    fn string_counts_characters_not_bytes() {
        assert_eq!(string(&json!("Größe"), 1, 5).unwrap(), "Größe");
        assert_eq!(
            string(&json!(""), 1, 5).unwrap_err().code,
            ReasonCode::TooShort
        );
        assert_eq!(
            string(&json!("abcdef"), 1, 5).unwrap_err().code,
            ReasonCode::TooLong
        );
    }

    #[test]
    fn url_requires_http_scheme() {
        assert!(url(&json!("https://www.parken-in-ulm.de/impressum.php"), 4096).is_ok());
        assert!(url(&json!("http://localhost:8080/x"), 4096).is_ok());
        assert_eq!(
            url(&json!("ftp://example.org"), 4096).unwrap_err().code,
            ReasonCode::InvalidUrl
        );
        assert_eq!(
            url(&json!("not a url"), 4096).unwrap_err().code,
            ReasonCode::InvalidUrl
        );
    }

    #[test]
    fn integer_accepts_strings_but_not_fractions() {
        assert_eq!(integer(&json!(12)).unwrap(), 12);
        assert_eq!(integer(&json!(" 12 ")).unwrap(), 12);
        assert!(integer(&json!(1.5)).is_err());
        assert!(integer(&json!("1,5")).is_err());
    }

    #[test]
    fn non_negative_rejects_negative() {
        let error = non_negative(&json!("-5")).unwrap_err();
        assert_eq!(error.code, ReasonCode::BelowMinimum);
        assert_eq!(error.received, Some(json!("-5")));
    }

    #[test]
    fn number_checks_range() {
        assert!((number(&json!("48.52"), 34.0, 72.0).unwrap() - 48.52).abs() < f64::EPSILON);
        assert_eq!(
            number(&json!(0), 34.0, 72.0).unwrap_err().code,
            ReasonCode::BelowMinimum
        );
        assert_eq!(
            number(&json!(80.1), 34.0, 72.0).unwrap_err().code,
            ReasonCode::AboveMaximum
        );
    }

    #[test]
    fn datetime_normalizes_to_utc_without_subseconds() {
        let dt = datetime(&json!("2024-04-01T14:13:14.567+02:00")).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-04-01T12:13:14+00:00");

        let naive = datetime(&json!("2024-04-01T12:13:14")).unwrap();
        assert_eq!(naive, dt);

        assert_eq!(
            datetime(&json!("01.04.2024")).unwrap_err().code,
            ReasonCode::InvalidDatetime
        );
    }

    #[test]
    fn enumeration_lists_allowed_values() {
        let site_type: ParkingSiteType = enumeration(&json!("UNDERGROUND")).unwrap();
        assert_eq!(site_type, ParkingSiteType::Underground);

        let error = enumeration::<ParkingSiteType>(&json!("GARAGE")).unwrap_err();
        assert_eq!(error.code, ReasonCode::NotAllowedValue);
        assert!(error.reason.contains("CAR_PARK"));
    }

    #[test]
    fn list_reports_every_bad_item() {
        let error = list(&json!(["a", 1, "b", 2]), |v| string(v, 1, 10)).unwrap_err();
        assert_eq!(error.code, ReasonCode::InvalidListItem);
        assert!(error.reason.contains("[1]"));
        assert!(error.reason.contains("[3]"));
    }
}
