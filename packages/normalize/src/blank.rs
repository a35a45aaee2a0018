//! Absence markers that are not validation failures.

use serde_json::Value;

/// Whether a spreadsheet cell counts as empty: null, an empty or
/// whitespace-only string, or a lone dash.
#[must_use]
pub fn is_excel_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            let s = s.trim();
            s.is_empty() || s == "-"
        }
        _ => false,
    }
}

/// Maps spreadsheet blanks to `null` and leaves everything else untouched.
#[must_use]
pub fn excel_blank(value: Value) -> Value {
    if is_excel_blank(&value) {
        Value::Null
    } else {
        value
    }
}

/// Maps a numeric zero (`0`, `0.0`, `"0"`, `"0,0"`) to `null`.
///
/// For upstreams that use zero as "no value" on fields where a real zero
/// is meaningless, such as clearance height.
#[must_use]
pub fn zero_as_absent(value: Value) -> Value {
    let is_zero = match &value {
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok() == Some(0.0),
        _ => false,
    };
    if is_zero { Value::Null } else { value }
}
