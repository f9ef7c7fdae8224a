// ============================================================
// INSIGHT GENERATOR
// ============================================================
// Rule-based findings in a fixed order:
// overview, data quality, correlation, cardinality.
// A rule that cannot be evaluated is dropped; the others still run.

use std::collections::HashSet;

use tracing::debug;

use super::statistics::{group_thousands, pearson};
use crate::domain::analysis::{AnalysisConfig, CorrelationMatrix, Insight, InsightCategory};
use crate::domain::table::{Cell, Table};

/// |r| at or above this counts as perfect (self or duplicate) correlation
const PERFECT_CORRELATION: f64 = 1.0 - 1e-12;

pub struct InsightGenerator {
    config: AnalysisConfig,
}

impl InsightGenerator {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn generate_insights(
        &self,
        table: &Table,
        numeric_cols: &[String],
        categorical_cols: &[String],
    ) -> Vec<Insight> {
        let mut insights = vec![overview(table), self.data_quality(table)];

        if let Some(insight) = self.correlation(table, numeric_cols) {
            insights.push(insight);
        }
        if let Some(insight) = self.cardinality(table, categorical_cols) {
            insights.push(insight);
        }

        insights
    }

    fn data_quality(&self, table: &Table) -> Insight {
        let total_cells = table.cell_count();
        let missing = table.missing_count();

        if total_cells == 0 || missing == 0 {
            return Insight::new(
                InsightCategory::DataQuality,
                "No missing values were detected.",
            );
        }

        let pct = missing as f64 / total_cells as f64 * 100.0;
        let tier = if pct < self.config.low_missing_pct {
            "Missing data is low; minor cleanup may be enough."
        } else {
            "The data needs cleaning before analysis."
        };

        Insight::new(
            InsightCategory::DataQualityIssue,
            format!(
                "Found {} missing values ({:.2}% of total data). {}",
                group_thousands(missing),
                pct,
                tier
            ),
        )
    }

    /// Counts unordered pairs (i < j) with threshold < |r| < 1
    fn correlation(&self, table: &Table, numeric_cols: &[String]) -> Option<Insight> {
        if numeric_cols.len() < 2 {
            return None;
        }

        let matrix = correlation_matrix(table, numeric_cols);
        let mut pairs = 0usize;
        for i in 0..matrix.columns.len() {
            for j in (i + 1)..matrix.columns.len() {
                let r = matrix.values[i][j].abs();
                if r.is_nan() {
                    continue;
                }
                if r > self.config.high_correlation_threshold && r < PERFECT_CORRELATION {
                    pairs += 1;
                }
            }
        }

        if pairs == 0 {
            debug!(columns = matrix.columns.len(), "No highly correlated pairs");
            return None;
        }

        Some(Insight::new(
            InsightCategory::Correlation,
            format!(
                "Found {} pair(s) of highly correlated numeric columns (correlation > {}).",
                pairs, self.config.high_correlation_threshold
            ),
        ))
    }

    fn cardinality(&self, table: &Table, categorical_cols: &[String]) -> Option<Insight> {
        let rows = table.row_count();
        if rows == 0 {
            return None;
        }

        let flagged: Vec<&str> = categorical_cols
            .iter()
            .filter_map(|name| table.column(name))
            .filter(|column| {
                let distinct = column
                    .values
                    .iter()
                    .filter(|cell| !cell.is_missing())
                    .map(Cell::render)
                    .collect::<HashSet<_>>()
                    .len();
                distinct > self.config.cardinality_floor
                    && distinct as f64 / rows as f64 > self.config.cardinality_ratio
            })
            .map(|column| column.name.as_str())
            .collect();

        if flagged.is_empty() {
            return None;
        }

        Some(Insight::new(
            InsightCategory::Cardinality,
            format!(
                "High cardinality detected in columns: {}.",
                flagged.join(", ")
            ),
        ))
    }
}

impl Default for InsightGenerator {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

fn overview(table: &Table) -> Insight {
    Insight::new(
        InsightCategory::Overview,
        format!(
            "The dataset contains {} rows and {} columns.",
            group_thousands(table.row_count()),
            table.column_count()
        ),
    )
}

/// Pairwise-complete Pearson matrix over the named numeric columns.
/// Names that are missing from the table are skipped.
pub fn correlation_matrix(table: &Table, numeric_cols: &[String]) -> CorrelationMatrix {
    let series: Vec<(String, Vec<Option<f64>>)> = numeric_cols
        .iter()
        .filter_map(|name| table.column(name))
        .filter(|column| column.kind.is_numeric())
        .map(|column| {
            (
                column.name.clone(),
                column.values.iter().map(Cell::as_f64).collect(),
            )
        })
        .collect();

    let n = series.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(&series[i].1, &series[j].1);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        columns: series.into_iter().map(|(name, _)| name).collect(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::Column;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_overview_and_no_missing() {
        let table = Table::new(vec![Column::integers("a", vec![Some(1), Some(2)])]).unwrap();
        let insights = InsightGenerator::default().generate_insights(&table, &names(&["a"]), &[]);

        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].category, InsightCategory::Overview);
        assert_eq!(
            insights[0].message,
            "The dataset contains 2 rows and 1 columns."
        );
        assert_eq!(insights[1].category, InsightCategory::DataQuality);
    }

    #[test]
    fn test_missing_data_tiers() {
        let sparse = Table::new(vec![Column::integers("a", vec![Some(1), None])]).unwrap();
        let insights = InsightGenerator::default().generate_insights(&sparse, &[], &[]);
        assert_eq!(insights[1].category, InsightCategory::DataQualityIssue);
        assert!(insights[1].message.contains("50.00%"));
        assert!(insights[1].message.contains("needs cleaning"));

        let mut values: Vec<Option<i64>> = (0..99).map(Some).collect();
        values.push(None);
        let mostly_full = Table::new(vec![Column::integers("a", values)]).unwrap();
        let insights = InsightGenerator::default().generate_insights(&mostly_full, &[], &[]);
        assert!(insights[1].message.contains("1.00%"));
        assert!(insights[1].message.contains("low"));
    }

    #[test]
    fn test_correlated_pair_counted_once() {
        let table = Table::new(vec![
            Column::floats("x", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]),
            Column::floats("y", vec![Some(1.1), Some(2.3), Some(2.8), Some(4.2), Some(4.9)]),
            Column::floats("z", vec![Some(3.0), Some(-1.0), Some(4.0), Some(-2.0), Some(3.0)]),
        ])
        .unwrap();
        let numeric = names(&["x", "y", "z"]);
        let insights = InsightGenerator::default().generate_insights(&table, &numeric, &[]);

        let correlation: Vec<&Insight> = insights
            .iter()
            .filter(|i| i.category == InsightCategory::Correlation)
            .collect();
        assert_eq!(correlation.len(), 1);
        assert!(correlation[0].message.starts_with("Found 1 pair(s)"));
    }

    #[test]
    fn test_perfect_duplicate_column_not_counted() {
        let table = Table::new(vec![
            Column::integers("a", vec![Some(1), Some(2), Some(3)]),
            Column::integers("b", vec![Some(2), Some(4), Some(6)]),
        ])
        .unwrap();
        let insights =
            InsightGenerator::default().generate_insights(&table, &names(&["a", "b"]), &[]);
        assert!(insights
            .iter()
            .all(|i| i.category != InsightCategory::Correlation));
    }

    #[test]
    fn test_all_null_numeric_columns_degrade_gracefully() {
        let table = Table::new(vec![
            Column::floats("a", vec![None, None]),
            Column::floats("b", vec![None, None]),
        ])
        .unwrap();
        let insights =
            InsightGenerator::default().generate_insights(&table, &names(&["a", "b"]), &[]);
        assert_eq!(insights.len(), 2);
    }

    #[test]
    fn test_high_cardinality_flagged() {
        let ids: Vec<Option<String>> = (0..60).map(|i| Some(format!("id-{}", i))).collect();
        let groups: Vec<Option<&str>> = (0..60)
            .map(|i| Some(if i % 2 == 0 { "even" } else { "odd" }))
            .collect();
        let table = Table::new(vec![
            Column::texts("order_id", ids),
            Column::texts("parity", groups),
        ])
        .unwrap();
        let insights = InsightGenerator::default().generate_insights(
            &table,
            &[],
            &names(&["order_id", "parity"]),
        );

        let last = insights.last().unwrap();
        assert_eq!(last.category, InsightCategory::Cardinality);
        assert_eq!(last.message, "High cardinality detected in columns: order_id.");
    }

    #[test]
    fn test_every_rule_fires_in_order() {
        let rows = 60;
        let x: Vec<Option<f64>> = (0..rows).map(|i| Some(i as f64)).collect();
        let y: Vec<Option<f64>> = (0..rows)
            .map(|i| if i == 7 { None } else { Some(i as f64 * 2.0 + (i % 3) as f64) })
            .collect();
        let ids: Vec<Option<String>> = (0..rows).map(|i| Some(format!("order-{}", i))).collect();
        let table = Table::new(vec![
            Column::floats("x", x),
            Column::floats("y", y),
            Column::texts("order_id", ids),
        ])
        .unwrap();

        let insights = InsightGenerator::default().generate_insights(
            &table,
            &names(&["x", "y"]),
            &names(&["order_id"]),
        );
        let categories: Vec<InsightCategory> = insights.iter().map(|i| i.category).collect();
        assert_eq!(
            categories,
            vec![
                InsightCategory::Overview,
                InsightCategory::DataQualityIssue,
                InsightCategory::Correlation,
                InsightCategory::Cardinality,
            ]
        );
        assert!(insights[1].message.starts_with("Found 1 missing values"));
        assert!(insights[2].message.starts_with("Found 1 pair(s)"));
    }

    #[test]
    fn test_correlation_matrix_is_symmetric() {
        let table = Table::new(vec![
            Column::integers("a", vec![Some(1), Some(2), Some(3), Some(5)]),
            Column::floats("b", vec![Some(2.0), Some(1.0), Some(4.0), Some(3.0)]),
        ])
        .unwrap();
        let matrix = correlation_matrix(&table, &names(&["a", "b"]));
        assert_eq!(matrix.get("a", "b"), matrix.get("b", "a"));
        assert!((matrix.get("a", "a").unwrap() - 1.0).abs() < 1e-12);
    }
}
