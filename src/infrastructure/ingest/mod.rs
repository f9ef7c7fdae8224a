// ============================================================
// INGESTION LAYER
// ============================================================
// Uploaded bytes -> Table, and Table -> CSV text for export.
//
// Readers produce a RawGrid (header plus loosely typed cells); kind
// inference then picks one ColumnKind per column and builds the Table.

mod csv_parser;
mod excel_reader;
mod export;
mod kind_inference;

pub use csv_parser::CsvParser;
pub use excel_reader::read_workbook;
pub use export::write_csv;
pub use kind_inference::build_table;

use tracing::info;

use crate::domain::catalog::FileType;
use crate::domain::error::{AppError, Result};
use crate::domain::table::Table;

/// A cell as a reader saw it, before the column kind is known
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Missing,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Header row plus data rows, padded to the header width
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
}

/// Parse an upload into a table, choosing the reader from the file extension
pub fn load_table(filename: &str, bytes: &[u8], max_upload_bytes: u64) -> Result<(Table, FileType)> {
    if bytes.len() as u64 > max_upload_bytes {
        return Err(AppError::ValidationError(format!(
            "File '{}' is {} bytes, the upload limit is {} bytes",
            filename,
            bytes.len(),
            max_upload_bytes
        )));
    }

    let file_type = FileType::from_filename(filename)?;
    let grid = match file_type {
        FileType::Csv => CsvParser::auto_detect(bytes).parse_bytes(bytes)?,
        FileType::Excel => read_workbook(bytes)?,
    };
    let table = build_table(grid)?;

    info!(
        filename,
        file_type = %file_type,
        rows = table.row_count(),
        columns = table.column_count(),
        "Parsed upload"
    );
    Ok((table, file_type))
}

/// Blank headers become `Unnamed: {index}`; repeats get a `.{n}` suffix.
pub(crate) fn normalize_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(headers.len());
    for (index, header) in headers.into_iter().enumerate() {
        let base = match header.trim() {
            "" => format!("Unnamed: {}", index),
            name => name.to_string(),
        };
        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.push(candidate);
    }
    seen
}
