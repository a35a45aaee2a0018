//! Total field reader over a loosely typed input mapping.

use serde_json::{Map, Value};

use crate::validation::{FieldError, FieldViolation, ValidationError};

/// Reads fields out of an input mapping while collecting every violation.
///
/// Each accessor returns a usable value even when the field is rejected
/// (the default for required fields, `None` for optional ones), so a
/// constructor can read all of its fields unconditionally and then call
/// [`InputReader::finish`] once. Absent keys and explicit `null` are
/// treated the same. Keys nobody asks for are ignored.
pub struct InputReader<'a> {
    input: &'a Map<String, Value>,
    violations: Vec<FieldViolation>,
}

impl<'a> InputReader<'a> {
    #[must_use]
    pub const fn new(input: &'a Map<String, Value>) -> Self {
        Self {
            input,
            violations: Vec::new(),
        }
    }

    /// The raw, non-null value of `field`.
    #[must_use]
    pub fn raw(&self, field: &str) -> Option<&'a Value> {
        self.input.get(field).filter(|v| !v.is_null())
    }

    /// Reads a field that must be present.
    pub fn required<T: Default>(
        &mut self,
        field: &str,
        validate: impl FnOnce(&Value) -> Result<T, FieldError>,
    ) -> T {
        let Some(value) = self.raw(field) else {
            self.violations.push(FieldError::required().at(field));
            return T::default();
        };
        self.check(field, value, validate).unwrap_or_default()
    }

    /// Reads a field that may be absent.
    pub fn optional<T>(
        &mut self,
        field: &str,
        validate: impl FnOnce(&Value) -> Result<T, FieldError>,
    ) -> Option<T> {
        let value = self.raw(field)?;
        self.check(field, value, validate)
    }

    /// Reads a field that falls back to `default` when absent.
    pub fn defaulted<T>(
        &mut self,
        field: &str,
        default: T,
        validate: impl FnOnce(&Value) -> Result<T, FieldError>,
    ) -> T {
        self.optional(field, validate).unwrap_or(default)
    }

    /// Records a violation found by a cross-field rule.
    pub fn violate(&mut self, violation: FieldViolation) {
        self.violations.push(violation);
    }

    /// Whether `field` already has a violation.
    #[must_use]
    pub fn is_rejected(&self, field: &str) -> bool {
        self.violations
            .iter()
            .any(|v| v.field.as_deref() == Some(field))
    }

    /// Ends reading.
    ///
    /// # Errors
    ///
    /// Returns every collected violation if there was at least one.
    pub fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.violations))
        }
    }

    fn check<T>(
        &mut self,
        field: &str,
        value: &Value,
        validate: impl FnOnce(&Value) -> Result<T, FieldError>,
    ) -> Option<T> {
        match validate(value) {
            Ok(v) => Some(v),
            Err(e) => {
                self.violations.push(e.at(field));
                None
            }
        }
    }
}
