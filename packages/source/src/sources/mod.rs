//! Hand-written parking source implementations.
//!
//! Each module implements [`PullSource`](crate::PullSource) or
//! [`PushSource`](crate::PushSource) for one upstream whose shape is too
//! irregular for a [`SourceDefinition`](crate::source_def::SourceDefinition).

pub mod bahn_v2;
pub mod heidelberg;
pub mod karlsruhe;
pub mod kienzler;
pub mod mannheim;
pub mod parkapi_json;
pub mod ulm;

use serde_json::{Map, Value};

/// A canonical enum member as an input value.
pub(crate) fn canonical<E: AsRef<str>>(member: E) -> Value {
    Value::String(member.as_ref().to_string())
}

/// The trimmed, non-empty string form of a string or number field.
pub(crate) fn string_field(record: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match record.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

/// The last path segment of a link, without query or fragment.
pub(crate) fn last_path_segment(href: &str) -> Option<&str> {
    href.split(['?', '#'])
        .next()?
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn string_fields_are_trimmed_and_stringified() {
        let record = json!({"a": " x ", "b": 76133, "c": "  ", "d": null});
        let record = record.as_object().unwrap();
        assert_eq!(string_field(record, "a").as_deref(), Some("x"));
        assert_eq!(string_field(record, "b").as_deref(), Some("76133"));
        assert_eq!(string_field(record, "c"), None);
        assert_eq!(string_field(record, "d"), None);
        assert_eq!(string_field(record, "e"), None);
    }

    #[test]
    fn link_segments() {
        assert_eq!(last_path_segment("/parkhaeuser/fischerplatz"), Some("fischerplatz"));
        assert_eq!(last_path_segment("https://x.de/a/b/?x=1"), Some("b"));
        assert_eq!(last_path_segment("/"), None);
    }
}
