use csv::WriterBuilder;

use crate::domain::error::{AppError, Result};
use crate::domain::table::{Cell, Table};

/// Header row then one record per row. Nulls and NaN are empty fields.
pub fn write_csv(table: &Table) -> Result<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    writer
        .write_record(table.column_names())
        .map_err(|e| AppError::Internal(format!("Failed to write CSV header: {}", e)))?;

    for row in 0..table.row_count() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|column| export_field(&column.values[row]))
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| AppError::Internal(format!("Failed to write CSV row {}: {}", row, e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV output: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| AppError::Internal(format!("CSV output is not UTF-8: {}", e)))
}

/// Integral floats keep a `.0` so a re-import reads them back as floats
fn export_field(cell: &Cell) -> String {
    match cell {
        Cell::Float(v) if v.is_nan() => String::new(),
        Cell::Float(v) if v.is_finite() && v.fract() == 0.0 => format!("{:.1}", v),
        other => other.render(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::Column;

    #[test]
    fn test_write_csv() {
        let table = Table::new(vec![
            Column::integers("id", vec![Some(1), None]),
            Column::floats("amount", vec![Some(3.0), Some(0.25)]),
            Column::texts("note", vec![Some("a, b"), None]),
            Column::booleans("ok", vec![Some(true), Some(false)]),
        ])
        .unwrap();

        let csv = write_csv(&table).unwrap();
        assert_eq!(csv, "id,amount,note,ok\n1,3.0,\"a, b\",true\n,0.25,,false\n");
    }

    #[test]
    fn test_nan_exports_empty() {
        let table = Table::new(vec![
            Column::floats("f", vec![Some(f64::NAN)]),
            Column::integers("n", vec![Some(2)]),
        ])
        .unwrap();
        assert_eq!(write_csv(&table).unwrap(), "f,n\n,2\n");
    }
}
