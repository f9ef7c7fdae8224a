// ============================================================
// TABLE CODEC
// ============================================================
// Table <-> portable compressed text.
//
// Layout before compression (UTF-8, newline separated):
//   line 0: JSON header {"format","version","rows","columns":[{"name","kind"}]}
//   line 1..=rows: one JSON array per row, cells in column order
// The text is gzip-compressed and base64 encoded (standard alphabet).
//
// Numeric kinds travel in the header, so values never drift between
// integer and float: Integer cells are JSON integers and must decode as
// i64; Float cells are shortest round-trip JSON numbers, with non-finite
// values spelled "NaN", "inf" and "-inf".

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::domain::error::{AppError, Result};
use crate::domain::table::{Cell, Column, ColumnKind, Table};

const FORMAT_TAG: &str = "dataloom-table";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    format: String,
    version: u32,
    rows: usize,
    columns: Vec<ColumnHeader>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ColumnHeader {
    name: String,
    kind: ColumnKind,
}

/// Encode a table into an opaque base64 string
pub fn encode(table: &Table) -> Result<String> {
    let text = to_text(table)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .map_err(|e| AppError::Internal(format!("Failed to compress table: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| AppError::Internal(format!("Failed to finish compression: {}", e)))?;

    Ok(STANDARD.encode(compressed))
}

/// Decode a payload produced by [`encode`].
///
/// Any corruption yields `DecodeError`; a table is only returned whole.
pub fn decode(payload: &str) -> Result<Table> {
    let compressed = STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::DecodeError(format!("Payload is not valid base64: {}", e)))?;

    let mut text = String::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_string(&mut text)
        .map_err(|e| AppError::DecodeError(format!("Payload failed to decompress: {}", e)))?;

    from_text(&text)
}

fn to_text(table: &Table) -> Result<String> {
    let header = Header {
        format: FORMAT_TAG.to_string(),
        version: FORMAT_VERSION,
        rows: table.row_count(),
        columns: table
            .columns()
            .iter()
            .map(|c| ColumnHeader {
                name: c.name.clone(),
                kind: c.kind,
            })
            .collect(),
    };

    let mut text = serde_json::to_string(&header)
        .map_err(|e| AppError::Internal(format!("Failed to serialize table header: {}", e)))?;

    for row in 0..table.row_count() {
        let record: Vec<Value> = table
            .columns()
            .iter()
            .map(|column| cell_to_json(&column.values[row]))
            .collect();
        let line = serde_json::to_string(&record).map_err(|e| {
            AppError::Internal(format!("Failed to serialize row {}: {}", row, e))
        })?;
        text.push('\n');
        text.push_str(&line);
    }

    Ok(text)
}

fn from_text(text: &str) -> Result<Table> {
    let mut lines = text.split('\n');
    let header_line = lines
        .next()
        .filter(|line| !line.trim().is_empty())
        .ok_or_else(|| AppError::DecodeError("Payload has no header".to_string()))?;

    let header: Header = serde_json::from_str(header_line)
        .map_err(|e| AppError::DecodeError(format!("Invalid payload header: {}", e)))?;

    if header.format != FORMAT_TAG {
        return Err(AppError::DecodeError(format!(
            "Unknown payload format: {}",
            header.format
        )));
    }
    if header.version != FORMAT_VERSION {
        return Err(AppError::DecodeError(format!(
            "Unsupported payload version: {}",
            header.version
        )));
    }

    let mut values: Vec<Vec<Cell>> = header
        .columns
        .iter()
        .map(|_| Vec::with_capacity(header.rows.min(text.len())))
        .collect();

    let mut row_count = 0usize;
    for (row, line) in lines.enumerate() {
        let record: Vec<Value> = serde_json::from_str(line)
            .map_err(|e| AppError::DecodeError(format!("Row {} is not valid JSON: {}", row, e)))?;

        if record.len() != header.columns.len() {
            return Err(AppError::DecodeError(format!(
                "Row {} has {} cells, expected {}",
                row,
                record.len(),
                header.columns.len()
            )));
        }

        for (index, value) in record.into_iter().enumerate() {
            let column = &header.columns[index];
            let cell = cell_from_json(value, column.kind).map_err(|detail| {
                AppError::DecodeError(format!(
                    "Row {} column '{}': {}",
                    row, column.name, detail
                ))
            })?;
            values[index].push(cell);
        }
        row_count += 1;
    }

    if row_count != header.rows {
        return Err(AppError::DecodeError(format!(
            "Payload has {} rows, header declares {}",
            row_count, header.rows
        )));
    }

    let columns = header
        .columns
        .into_iter()
        .zip(values)
        .map(|(column, values)| Column {
            name: column.name,
            kind: column.kind,
            values,
        })
        .collect();

    Table::new(columns).map_err(|e| AppError::DecodeError(format!("Decoded table is invalid: {}", e)))
}

fn cell_to_json(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Integer(v) => Value::Number((*v).into()),
        Cell::Float(v) => match Number::from_f64(*v) {
            Some(number) => Value::Number(number),
            None if v.is_nan() => Value::String("NaN".to_string()),
            None if *v > 0.0 => Value::String("inf".to_string()),
            None => Value::String("-inf".to_string()),
        },
        Cell::Text(s) => Value::String(s.clone()),
        Cell::Boolean(b) => Value::Bool(*b),
    }
}

fn cell_from_json(value: Value, kind: ColumnKind) -> std::result::Result<Cell, String> {
    match (value, kind) {
        (Value::Null, _) => Ok(Cell::Null),
        (Value::Number(n), ColumnKind::Integer) => n
            .as_i64()
            .map(Cell::Integer)
            .ok_or_else(|| format!("{} is not a 64-bit integer", n)),
        (Value::Number(n), ColumnKind::Float) => n
            .as_f64()
            .map(Cell::Float)
            .ok_or_else(|| format!("{} is not a float", n)),
        (Value::String(s), ColumnKind::Float) => match s.as_str() {
            "NaN" => Ok(Cell::Float(f64::NAN)),
            "inf" => Ok(Cell::Float(f64::INFINITY)),
            "-inf" => Ok(Cell::Float(f64::NEG_INFINITY)),
            other => Err(format!("unexpected string {:?} in float column", other)),
        },
        (Value::String(s), ColumnKind::Text) => Ok(Cell::Text(s)),
        (Value::Bool(b), ColumnKind::Boolean) => Ok(Cell::Boolean(b)),
        (other, kind) => Err(format!("{} does not fit a {} column", other, kind)),
    }
}
