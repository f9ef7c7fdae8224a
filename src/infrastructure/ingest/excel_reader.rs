use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate};

use super::{normalize_headers, RawGrid, RawValue};
use crate::domain::error::{AppError, Result};

/// Largest magnitude below which every whole f64 is exact (2^53)
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Read the first worksheet; its first row is the header
pub fn read_workbook(bytes: &[u8]) -> Result<RawGrid> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| AppError::ParseError(format!("Failed to open Excel file: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::ParseError("No worksheet found in Excel file".to_string()))?
        .map_err(|e| AppError::ParseError(format!("Failed to read Excel range: {}", e)))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| AppError::ParseError("Worksheet has no header row".to_string()))?
        .iter()
        .map(|cell| match excel_cell_to_raw(cell) {
            RawValue::Missing => String::new(),
            RawValue::Text(s) => s,
            RawValue::Int(v) => v.to_string(),
            RawValue::Float(v) => v.to_string(),
            RawValue::Bool(v) => v.to_string(),
        })
        .collect();

    let width = headers.len();
    let rows = rows
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| {
            let mut values: Vec<RawValue> = row.iter().take(width).map(excel_cell_to_raw).collect();
            values.resize(width, RawValue::Missing);
            values
        })
        .collect();

    Ok(RawGrid {
        headers: normalize_headers(headers),
        rows,
    })
}

fn excel_cell_to_raw(cell: &Data) -> RawValue {
    match cell {
        Data::Empty => RawValue::Missing,
        Data::String(s) if s.trim().is_empty() => RawValue::Missing,
        Data::String(s) => RawValue::Text(s.trim().to_string()),
        Data::Int(i) => RawValue::Int(*i),
        Data::Float(f) => narrow_float(*f),
        Data::Bool(b) => RawValue::Bool(*b),
        Data::DateTime(dt) => match excel_serial_to_text(dt.as_f64()) {
            Some(text) => RawValue::Text(text),
            None => RawValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawValue::Text(s.clone()),
        Data::Error(_) => RawValue::Missing,
    }
}

/// Workbooks store every number as a double; whole values read as integers
/// so a sheet and its CSV export infer the same column kinds.
fn narrow_float(value: f64) -> RawValue {
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER {
        RawValue::Int(value as i64)
    } else {
        RawValue::Float(value)
    }
}

/// Excel serial day number (1900 system) as `YYYY-MM-DD[ HH:MM:SS]`
fn excel_serial_to_text(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let datetime = epoch.checked_add_signed(Duration::milliseconds(millis))?;

    if millis % 86_400_000 == 0 {
        Some(datetime.format("%Y-%m-%d").to_string())
    } else {
        Some(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}
