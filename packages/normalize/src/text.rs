//! String cleanup.

use parkapi_parking_models::FieldError;
use serde_json::{Number, Value};

/// Applies each `(from, to)` replacement in order.
#[must_use]
pub fn replace_all(s: &str, replacements: &[(String, String)]) -> String {
    replacements
        .iter()
        .fold(s.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Turns numbers into their string form and passes strings through.
///
/// Spreadsheet tools auto-type identifiers and postcodes as numbers; this
/// undoes that. Integral floats lose their fractional part (`1234.0` →
/// `"1234"`).
///
/// # Errors
///
/// Fails on values that are neither numbers nor strings.
pub fn number_to_string(value: &Value) -> Result<String, FieldError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(number_text(n)),
        _ => Err(FieldError::invalid_type("string or number", value)),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn number_text(n: &Number) -> String {
    if n.is_f64()
        && let Some(f) = n.as_f64()
        && f.fract() == 0.0
        && f.abs() < 9.0e15
    {
        return (f as i64).to_string();
    }
    n.to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn replacements_apply_in_order() {
        let replacements = vec![
            ("\r\n".to_string(), ", ".to_string()),
            ("\n".to_string(), ", ".to_string()),
            ("â‚¬".to_string(), "€".to_string()),
        ];
        assert_eq!(
            replace_all("1 â‚¬/h\r\nmax. 5 â‚¬\nTag", &replacements),
            "1 €/h, max. 5 €, Tag"
        );
    }

    #[test]
    fn numbers_become_strings() {
        assert_eq!(number_to_string(&json!(73_728)).unwrap(), "73728");
        assert_eq!(number_to_string(&json!(12.0)).unwrap(), "12");
        assert_eq!(number_to_string(&json!(1.5)).unwrap(), "1.5");
        assert_eq!(number_to_string(&json!("P1")).unwrap(), "P1");
        assert!(number_to_string(&json!([1])).is_err());
    }
}
