// ============================================================
// OUTLIER DETECTOR
// ============================================================
// Tukey's fences per numeric column: [Q1 - k*IQR, Q3 + k*IQR]

use super::statistics::{quantile_sorted, sorted};
use crate::domain::analysis::{OutlierReport, OutlierStats};
use crate::domain::table::{Column, Table};

pub struct OutlierDetector {
    multiplier: f64,
}

impl OutlierDetector {
    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }

    /// Columns that are absent or non-numeric are skipped
    pub fn detect_outliers(&self, table: &Table, numeric_cols: &[String]) -> OutlierReport {
        let row_count = table.row_count();

        numeric_cols
            .iter()
            .filter_map(|name| table.column(name))
            .filter(|column| column.kind.is_numeric())
            .map(|column| (column.name.clone(), self.column_outliers(column, row_count)))
            .collect()
    }

    fn column_outliers(&self, column: &Column, row_count: usize) -> OutlierStats {
        let values = column.numeric_values();
        if values.is_empty() {
            return OutlierStats {
                count: 0,
                percentage: 0.0,
                lower_bound: f64::NAN,
                upper_bound: f64::NAN,
            };
        }

        let ordered = sorted(&values);
        let q1 = quantile_sorted(&ordered, 0.25);
        let q3 = quantile_sorted(&ordered, 0.75);
        let iqr = q3 - q1;
        let lower_bound = q1 - self.multiplier * iqr;
        let upper_bound = q3 + self.multiplier * iqr;

        let count = values
            .iter()
            .filter(|v| **v < lower_bound || **v > upper_bound)
            .count();
        let percentage = if row_count == 0 {
            0.0
        } else {
            count as f64 / row_count as f64 * 100.0
        };

        OutlierStats {
            count,
            percentage,
            lower_bound,
            upper_bound,
        }
    }
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self::new(1.5)
    }
}
