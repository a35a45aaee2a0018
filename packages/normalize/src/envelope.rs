//! Pre-validation transform for upstreams that wrap every field in an
//! envelope object such as `{"type": "Number", "value": 12}`.

use serde_json::{Map, Value};

/// Replaces every top-level field of the form `{ <key>: inner, ... }`
/// with `inner`. Fields that are not objects, or objects without `key`,
/// are left as they are.
pub fn unwrap_envelopes(record: &mut Map<String, Value>, key: &str) {
    for field in record.values_mut() {
        let inner = match field {
            Value::Object(envelope) => envelope.remove(key),
            _ => None,
        };
        if let Some(inner) = inner {
            *field = inner;
        }
    }
}

/// [`unwrap_envelopes`] with the conventional `value` key.
pub fn unwrap_value_envelopes(record: &mut Map<String, Value>) {
    unwrap_envelopes(record, "value");
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unwraps_only_enveloped_fields() {
        let mut record = json!({
            "type": "OffStreetParking",
            "staticName": {"type": "Text", "value": "P1 Altstadt"},
            "availableSpotNumber": {"type": "Number", "value": null},
            "location": {"type": "Point", "coordinates": [8.69, 49.41]},
        });
        unwrap_value_envelopes(record.as_object_mut().unwrap());

        assert_eq!(record["type"], json!("OffStreetParking"));
        assert_eq!(record["staticName"], json!("P1 Altstadt"));
        assert_eq!(record["availableSpotNumber"], Value::Null);
        assert_eq!(
            record["location"],
            json!({"type": "Point", "coordinates": [8.69, 49.41]})
        );
    }
}
