//! CSV payloads as row matrices.

use serde_json::Value;

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Parses CSV bytes into rows of string cells, header row included.
///
/// Rows may have different lengths; header lookup takes care of short
/// rows.
///
/// # Errors
///
/// Returns [`csv::Error`] on malformed quoting or invalid UTF-8.
pub fn parse_csv(bytes: &[u8], delimiter: u8) -> Result<Vec<Vec<Value>>, csv::Error> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|cell| Value::String(cell.to_string()))
                .collect(),
        );
    }
    Ok(rows)
}
