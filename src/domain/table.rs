// ============================================================
// TABLE
// ============================================================
// In-memory rectangular dataset: named, typed columns of equal length

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{AppError, Result};

/// Declared storage kind of a column, fixed when the table is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    Boolean,
}

impl ColumnKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Text => "text",
            ColumnKind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scalar value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

impl Cell {
    /// Null, NaN and blank text all count as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Float(v) => v.is_nan(),
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(v) => Some(*v as f64),
            Cell::Float(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    /// Display form used for frequency keys and report output
    pub fn render(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Integer(v) => v.to_string(),
            Cell::Float(v) => v.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Boolean(b) => b.to_string(),
        }
    }

    fn fits(&self, kind: ColumnKind) -> bool {
        matches!(
            (self, kind),
            (Cell::Null, _)
                | (Cell::Integer(_), ColumnKind::Integer)
                | (Cell::Float(_), ColumnKind::Float)
                | (Cell::Text(_), ColumnKind::Text)
                | (Cell::Boolean(_), ColumnKind::Boolean)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<Cell>,
}

impl Column {
    /// Build a column, checking every cell against the declared kind.
    ///
    /// Integers in a `Float` column are widened, so a numeric column mixing
    /// ints and floats has exactly one canonical form.
    pub fn new(name: impl Into<String>, kind: ColumnKind, values: Vec<Cell>) -> Result<Self> {
        let name = name.into();
        let mut canonical = Vec::with_capacity(values.len());

        for (row, cell) in values.into_iter().enumerate() {
            let cell = match (cell, kind) {
                (Cell::Integer(v), ColumnKind::Float) => Cell::Float(v as f64),
                (cell, kind) if cell.fits(kind) => cell,
                (cell, kind) => {
                    return Err(AppError::ValidationError(format!(
                        "Column '{}' row {}: value {:?} does not match declared kind {}",
                        name, row, cell, kind
                    )))
                }
            };
            canonical.push(cell);
        }

        Ok(Self {
            name,
            kind,
            values: canonical,
        })
    }

    pub fn integers(name: impl Into<String>, values: Vec<Option<i64>>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Integer,
            values: values
                .into_iter()
                .map(|v| v.map(Cell::Integer).unwrap_or(Cell::Null))
                .collect(),
        }
    }

    pub fn floats(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Float,
            values: values
                .into_iter()
                .map(|v| v.map(Cell::Float).unwrap_or(Cell::Null))
                .collect(),
        }
    }

    pub fn texts<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Text,
            values: values
                .into_iter()
                .map(|v| v.map(|s| Cell::Text(s.into())).unwrap_or(Cell::Null))
                .collect(),
        }
    }

    pub fn booleans(name: impl Into<String>, values: Vec<Option<bool>>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Boolean,
            values: values
                .into_iter()
                .map(|v| v.map(Cell::Boolean).unwrap_or(Cell::Null))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|c| c.is_missing()).count()
    }

    /// Non-missing numeric values in row order
    pub fn numeric_values(&self) -> Vec<f64> {
        self.values.iter().filter_map(Cell::as_f64).collect()
    }
}

/// Ordered sequence of equal-length columns; rows are implicit indices
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(ragged) = columns.iter().find(|c| c.len() != expected) {
                return Err(AppError::ValidationError(format!(
                    "Ragged table: column '{}' has {} rows, expected {}",
                    ragged.name,
                    ragged.len(),
                    expected
                )));
            }
        }

        for column in &columns {
            if let Some((row, cell)) = column
                .values
                .iter()
                .enumerate()
                .find(|(_, cell)| !cell.fits(column.kind))
            {
                return Err(AppError::ValidationError(format!(
                    "Column '{}' row {}: value {:?} does not match declared kind {}",
                    column.name, row, cell, column.kind
                )));
            }
        }

        Ok(Self { columns })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn cell_count(&self) -> usize {
        self.row_count() * self.column_count()
    }

    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// Rough in-memory footprint: 8 bytes per numeric or null cell,
    /// 1 per boolean, UTF-8 length for text, plus column names.
    pub fn estimated_size_bytes(&self) -> usize {
        self.columns
            .iter()
            .map(|column| {
                column.name.len()
                    + column
                        .values
                        .iter()
                        .map(|cell| match cell {
                            Cell::Null | Cell::Integer(_) | Cell::Float(_) => 8,
                            Cell::Boolean(_) => 1,
                            Cell::Text(s) => s.len(),
                        })
                        .sum::<usize>()
            })
            .sum()
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}
