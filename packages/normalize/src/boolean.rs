//! Boolean coercion through a configurable string table.

use std::collections::BTreeMap;

use parkapi_parking_models::{FieldError, value};
use serde::Deserialize;
use serde_json::Value;

/// Maps strings such as `"ja"`/`"nein"` to booleans.
///
/// Keys are matched case-insensitively. Strings that are not in the table
/// fall through to the standard boolean coercion, which accepts only
/// `true`/`false`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "MappedBooleanConfig")]
pub struct MappedBoolean {
    mapping: BTreeMap<String, bool>,
}

#[derive(Deserialize)]
struct MappedBooleanConfig {
    mapping: BTreeMap<String, bool>,
}

impl From<MappedBooleanConfig> for MappedBoolean {
    fn from(config: MappedBooleanConfig) -> Self {
        Self::new(config.mapping)
    }
}

impl MappedBoolean {
    #[must_use]
    pub fn new<K: AsRef<str>>(mapping: impl IntoIterator<Item = (K, bool)>) -> Self {
        Self {
            mapping: mapping
                .into_iter()
                .map(|(k, v)| (k.as_ref().trim().to_lowercase(), v))
                .collect(),
        }
    }

    /// `ja` → true, `nein` → false.
    #[must_use]
    pub fn german() -> Self {
        Self::new([("ja", true), ("nein", false)])
    }

    /// Coerces `value`.
    ///
    /// # Errors
    ///
    /// Fails if the value is neither in the table nor a standard boolean.
    pub fn validate(&self, value: &Value) -> Result<bool, FieldError> {
        if let Value::String(s) = value
            && let Some(mapped) = self.mapping.get(&s.trim().to_lowercase())
        {
            return Ok(*mapped);
        }
        value::boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use parkapi_parking_models::ReasonCode;
    use serde_json::json;

    use super::*;

    #[test]
    fn matches_case_insensitively() {
        let mapped = MappedBoolean::new([("ja", true), ("nein", false)]);
        assert!(mapped.validate(&json!("ja")).unwrap());
        assert!(mapped.validate(&json!("JA")).unwrap());
        assert!(!mapped.validate(&json!("nein")).unwrap());
        assert!(mapped.validate(&json!(true)).unwrap());
    }

    #[test]
    fn rejects_unmapped_strings() {
        let error = MappedBoolean::german()
            .validate(&json!("vielleicht"))
            .unwrap_err();
        assert_eq!(error.code, ReasonCode::NotAllowedValue);
    }

    #[test]
    fn table_keys_are_lowercased() {
        let mapped = MappedBoolean::new([("WAHR", true), ("Falsch", false)]);
        assert!(mapped.validate(&json!("wahr")).unwrap());
        assert!(!mapped.validate(&json!("FALSCH")).unwrap());
    }
}
