//! XLSX payloads.
//!
//! Workbooks are read with `calamine` and flattened into JSON cells so the
//! same header lookup and normalizers work for spreadsheets and CSV.
//! Date and time cells become ISO strings: a pure time of day as
//! `HH:MM:SS`, anything else as a naive `YYYY-MM-DDTHH:MM:SS`.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use chrono::{NaiveDate, NaiveTime, TimeDelta};
use serde_json::{Number, Value};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// One worksheet as a row matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Value>>,
}

/// All worksheets of a workbook, in workbook order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Reads an XLSX file from memory.
    ///
    /// # Errors
    ///
    /// Returns [`calamine::XlsxError`] if the bytes are not a readable
    /// XLSX workbook.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, calamine::XlsxError> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name)?;
            let rows = range
                .rows()
                .map(|row| row.iter().map(cell_value).collect())
                .collect();
            sheets.push(Sheet { name, rows });
        }
        Ok(Self { sheets })
    }

    #[must_use]
    pub const fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    /// The sheet called `name`, or the first sheet when `name` is `None`.
    #[must_use]
    pub fn sheet(&self, name: Option<&str>) -> Option<&Sheet> {
        match name {
            Some(name) => self.sheets.iter().find(|sheet| sheet.name == name),
            None => self.sheets.first(),
        }
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => float_cell(*f),
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => excel_serial(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) | Data::Empty => Value::Null,
    }
}

/// Spreadsheets store every number as a float; integral ones come back as
/// integers.
#[allow(clippy::cast_possible_truncation)]
fn float_cell(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        Value::from(f as i64)
    } else {
        Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

/// Converts an Excel serial date (days since 1899-12-30, fraction = time
/// of day).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn excel_serial(serial: f64) -> Value {
    let seconds = (serial * SECONDS_PER_DAY).round();
    if !seconds.is_finite() || seconds < 0.0 {
        return Value::Null;
    }
    if serial < 1.0 {
        return NaiveTime::from_num_seconds_from_midnight_opt(seconds as u32 % 86_400, 0)
            .map_or(Value::Null, |t| Value::String(t.format("%H:%M:%S").to_string()));
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.and_hms_opt(0, 0, 0))
        .zip(TimeDelta::try_seconds(seconds as i64))
        .and_then(|(epoch, delta)| epoch.checked_add_signed(delta))
        .map_or(Value::Null, |dt| {
            Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn integral_floats_become_integers() {
        assert_eq!(cell_value(&Data::Float(42.0)), json!(42));
        assert_eq!(cell_value(&Data::Float(9.25)), json!(9.25));
        assert_eq!(cell_value(&Data::Empty), Value::Null);
        assert_eq!(cell_value(&Data::String("ja".into())), json!("ja"));
    }

    #[test]
    fn excel_serials_become_iso_strings() {
        assert_eq!(excel_serial(0.5), json!("12:00:00"));
        assert_eq!(excel_serial(0.3125), json!("07:30:00"));
        assert_eq!(excel_serial(45_383.5), json!("2024-04-01T12:00:00"));
        assert_eq!(excel_serial(-1.0), Value::Null);
    }

    #[test]
    fn selects_sheets_by_name() {
        let workbook = Workbook::from_sheets(vec![
            Sheet {
                name: "Info".to_string(),
                rows: vec![],
            },
            Sheet {
                name: "Daten".to_string(),
                rows: vec![vec![json!("ID")]],
            },
        ]);
        assert_eq!(workbook.sheet(None).unwrap().name, "Info");
        assert_eq!(workbook.sheet(Some("Daten")).unwrap().rows.len(), 1);
        assert!(workbook.sheet(Some("Missing")).is_none());
    }

    #[test]
    fn rejects_non_xlsx_bytes() {
        assert!(Workbook::from_bytes(b"id,name\n1,Lot A\n").is_err());
    }
}
