use crate::domain::error::Result;
use crate::domain::table::{Cell, Column, ColumnKind, Table};

use super::{RawGrid, RawValue};

/// Tokens read as missing, matched after trimming
const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A", "<NA>",
];

/// Pick one kind per column, then convert every cell to it.
///
/// Integer when every present value is an integer, Float when every value
/// is numeric, Boolean when every value is true/false, Text otherwise.
/// A column with no present values is Text.
pub fn build_table(grid: RawGrid) -> Result<Table> {
    let RawGrid { headers, rows } = grid;

    let mut columns: Vec<Vec<RawValue>> = headers.iter().map(|_| Vec::with_capacity(rows.len())).collect();
    for row in rows {
        for (index, value) in row.into_iter().enumerate().take(columns.len()) {
            columns[index].push(normalize_missing(value));
        }
    }

    let columns = headers
        .into_iter()
        .zip(columns)
        .map(|(name, raw)| {
            let kind = infer_kind(&raw);
            let values = raw.into_iter().map(|value| convert(value, kind)).collect();
            Column::new(name, kind, values)
        })
        .collect::<Result<Vec<_>>>()?;

    Table::new(columns)
}

fn normalize_missing(value: RawValue) -> RawValue {
    match value {
        RawValue::Text(s) if MISSING_TOKENS.contains(&s.trim()) => RawValue::Missing,
        RawValue::Float(f) if f.is_nan() => RawValue::Missing,
        other => other,
    }
}

pub(crate) fn infer_kind(values: &[RawValue]) -> ColumnKind {
    let present: Vec<&RawValue> = values
        .iter()
        .filter(|v| !matches!(v, RawValue::Missing))
        .collect();
    if present.is_empty() {
        return ColumnKind::Text;
    }

    if present.iter().all(|v| as_integer(v).is_some()) {
        ColumnKind::Integer
    } else if present.iter().all(|v| as_float(v).is_some()) {
        ColumnKind::Float
    } else if present.iter().all(|v| as_bool(v).is_some()) {
        ColumnKind::Boolean
    } else {
        ColumnKind::Text
    }
}

fn convert(value: RawValue, kind: ColumnKind) -> Cell {
    if matches!(value, RawValue::Missing) {
        return Cell::Null;
    }
    match kind {
        ColumnKind::Integer => as_integer(&value).map(Cell::Integer).unwrap_or(Cell::Null),
        ColumnKind::Float => as_float(&value).map(Cell::Float).unwrap_or(Cell::Null),
        ColumnKind::Boolean => as_bool(&value).map(Cell::Boolean).unwrap_or(Cell::Null),
        ColumnKind::Text => Cell::Text(render(value)),
    }
}

fn as_integer(value: &RawValue) -> Option<i64> {
    match value {
        RawValue::Int(v) => Some(*v),
        RawValue::Text(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn as_float(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Int(v) => Some(*v as f64),
        RawValue::Float(v) => Some(*v),
        RawValue::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn as_bool(value: &RawValue) -> Option<bool> {
    match value {
        RawValue::Bool(b) => Some(*b),
        RawValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn render(value: RawValue) -> String {
    match value {
        RawValue::Missing => String::new(),
        RawValue::Text(s) => s,
        RawValue::Int(v) => v.to_string(),
        RawValue::Float(v) => v.to_string(),
        RawValue::Bool(v) => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(values: &[&str]) -> Vec<RawValue> {
        values
            .iter()
            .map(|v| normalize_missing(RawValue::Text(v.to_string())))
            .collect()
    }

    #[test]
    fn test_infer_kinds() {
        assert_eq!(infer_kind(&text(&["1", "-2", "NA"])), ColumnKind::Integer);
        assert_eq!(infer_kind(&text(&["1", "2.5"])), ColumnKind::Float);
        assert_eq!(infer_kind(&text(&["True", "false"])), ColumnKind::Boolean);
        assert_eq!(infer_kind(&text(&["1", "x"])), ColumnKind::Text);
        assert_eq!(infer_kind(&text(&["", "null"])), ColumnKind::Text);
    }

    #[test]
    fn test_non_finite_text_stays_text() {
        assert_eq!(infer_kind(&text(&["1.5", "inf"])), ColumnKind::Text);
    }

    #[test]
    fn test_typed_excel_cells() {
        let values = vec![RawValue::Int(1), RawValue::Float(2.5), RawValue::Missing];
        assert_eq!(infer_kind(&values), ColumnKind::Float);
    }

    #[test]
    fn test_build_table() {
        let grid = RawGrid {
            headers: vec!["id".to_string(), "city".to_string()],
            rows: vec![
                vec![RawValue::Text("1".to_string()), RawValue::Text("Oslo".to_string())],
                vec![RawValue::Text("2".to_string()), RawValue::Text("N/A".to_string())],
            ],
        };
        let table = build_table(grid).unwrap();
        assert_eq!(table.column("id").unwrap().values, vec![Cell::Integer(1), Cell::Integer(2)]);
        assert_eq!(table.column("city").unwrap().values[1], Cell::Null);
        assert_eq!(table.missing_count(), 1);
    }

    #[test]
    fn test_headers_without_rows() {
        let grid = RawGrid {
            headers: vec!["a".to_string(), "b".to_string()],
            rows: vec![],
        };
        let table = build_table(grid).unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 2);
    }
}
