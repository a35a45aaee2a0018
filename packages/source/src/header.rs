//! Header-row lookup for row containers (CSV, XLSX).

use serde_json::{Map, Value};

use crate::SourceError;

/// Column positions of the headers a source reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderIndex {
    columns: Vec<(String, usize)>,
}

fn header_text(cell: &Value) -> Option<String> {
    match cell {
        Value::String(s) => Some(s.trim().trim_start_matches('\u{feff}').to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl HeaderIndex {
    /// Locates each of `columns` in `header`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Import`] naming the first header that is not
    /// present; without it no row of the payload can be read.
    pub fn resolve<'a>(
        source_uid: &str,
        header: &[Value],
        columns: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, SourceError> {
        let names: Vec<Option<String>> = header.iter().map(header_text).collect();
        let mut resolved = Vec::new();
        for column in columns {
            let position = names
                .iter()
                .position(|name| name.as_deref() == Some(column))
                .ok_or_else(|| {
                    SourceError::import(source_uid, format!("cannot find header key {column}"))
                })?;
            resolved.push((column.to_string(), position));
        }
        Ok(Self { columns: resolved })
    }

    /// The row as a mapping from header name to cell. Short rows yield
    /// `null` for the missing cells.
    #[must_use]
    pub fn record(&self, row: &[Value]) -> Map<String, Value> {
        self.columns
            .iter()
            .map(|(name, position)| {
                (
                    name.clone(),
                    row.get(*position).cloned().unwrap_or(Value::Null),
                )
            })
            .collect()
    }
}

/// Splits a row matrix into its header row and the data rows.
///
/// # Errors
///
/// Returns [`SourceError::Import`] for an empty matrix.
pub fn split_header<'a>(
    source_uid: &str,
    rows: &'a [Vec<Value>],
) -> Result<(&'a [Value], &'a [Vec<Value>]), SourceError> {
    rows.split_first()
        .map(|(header, data)| (header.as_slice(), data))
        .ok_or_else(|| SourceError::import(source_uid, "payload has no header row"))
}
