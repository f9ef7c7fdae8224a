// ============================================================
// PROFILER
// ============================================================
// Summary statistics over a loaded table

use std::collections::HashMap;

use super::schema_inference::SchemaInferer;
use super::statistics::{mean, quantile_sorted, sample_std, sorted};
use crate::domain::analysis::{
    AnalysisConfig, CategoricalSummary, ColumnClassification, ColumnProfile, NumericSummary,
    SummaryStats, ValueFrequency,
};
use crate::domain::table::{Column, Table};

pub struct Profiler {
    config: AnalysisConfig,
}

impl Profiler {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Summarize with a fresh column classification
    pub fn summarize(&self, table: &Table) -> SummaryStats {
        let classification =
            SchemaInferer::new(self.config.datetime_sample_size).classify(table);
        self.summarize_with(table, &classification)
    }

    pub fn summarize_with(
        &self,
        table: &Table,
        classification: &ColumnClassification,
    ) -> SummaryStats {
        let columns = table
            .columns()
            .iter()
            .map(|column| {
                let null_count = column.missing_count();
                ColumnProfile {
                    name: column.name.clone(),
                    kind: column.kind,
                    non_null_count: column.len() - null_count,
                    null_count,
                }
            })
            .collect();

        let numeric = classification
            .numeric
            .iter()
            .filter_map(|name| table.column(name))
            .map(summarize_numeric)
            .collect();

        let categorical = classification
            .categorical
            .iter()
            .take(self.config.categorical_profile_limit)
            .filter_map(|name| table.column(name))
            .map(|column| summarize_categorical(column, self.config.top_k))
            .collect();

        SummaryStats {
            row_count: table.row_count(),
            column_count: table.column_count(),
            missing_value_count: table.missing_count(),
            estimated_size_bytes: table.estimated_size_bytes(),
            column_types: classification.counts(),
            columns,
            numeric,
            categorical,
        }
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

pub fn summarize_numeric(column: &Column) -> NumericSummary {
    let values = column.numeric_values();
    let ordered = sorted(&values);

    NumericSummary {
        column: column.name.clone(),
        count: values.len(),
        mean: mean(&values),
        std: sample_std(&values),
        min: ordered.first().copied().unwrap_or(f64::NAN),
        q25: quantile_sorted(&ordered, 0.25),
        median: quantile_sorted(&ordered, 0.5),
        q75: quantile_sorted(&ordered, 0.75),
        max: ordered.last().copied().unwrap_or(f64::NAN),
    }
}

/// Distinct count plus the `top_k` most frequent values.
/// Ties resolve by first appearance so output never depends on hash order.
pub fn summarize_categorical(column: &Column, top_k: usize) -> CategoricalSummary {
    let (unique_count, frequencies) = value_frequencies(column);

    CategoricalSummary {
        column: column.name.clone(),
        unique_count,
        top_values: frequencies.into_iter().take(top_k).collect(),
    }
}

/// All non-missing values ranked by count desc, then first-seen order
pub fn value_frequencies(column: &Column) -> (usize, Vec<ValueFrequency>) {
    // value -> (count, first row seen)
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();

    for (row, cell) in column.values.iter().enumerate() {
        if cell.is_missing() {
            continue;
        }
        counts
            .entry(cell.render())
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, row));
    }

    let unique_count = counts.len();
    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(value, (count, first))| (value, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    let frequencies = ranked
        .into_iter()
        .map(|(value, count, _)| ValueFrequency { value, count })
        .collect();

    (unique_count, frequencies)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table::new(vec![
            Column::integers("amount", vec![Some(10), Some(20), Some(30), None]),
            Column::texts("category", vec![Some("a"), Some("a"), Some("b"), Some("c")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_summary_counts() {
        let summary = Profiler::default().summarize(&sample_table());

        assert_eq!(summary.row_count, 4);
        assert_eq!(summary.column_count, 2);
        assert_eq!(summary.missing_value_count, 1);
        assert_eq!(summary.column_types.numeric, 1);
        assert_eq!(summary.column_types.categorical, 1);

        let amount = summary.numeric_summary("amount").unwrap();
        assert_eq!(amount.count, 3);
        assert_eq!(amount.mean, 20.0);
        assert_eq!(amount.std, 10.0);
        assert_eq!(amount.min, 10.0);
        assert_eq!(amount.median, 20.0);
        assert_eq!(amount.max, 30.0);

        let category = summary.categorical_summary("category").unwrap();
        assert_eq!(category.unique_count, 3);
        assert_eq!(category.top_values[0].value, "a");
        assert_eq!(category.top_values[0].count, 2);
    }

    #[test]
    fn test_column_profiles() {
        let summary = Profiler::default().summarize(&sample_table());
        assert_eq!(summary.columns[0].name, "amount");
        assert_eq!(summary.columns[0].non_null_count, 3);
        assert_eq!(summary.columns[0].null_count, 1);
    }

    #[test]
    fn test_all_null_numeric_column_is_nan_not_panic() {
        let table = Table::new(vec![Column::floats("empty", vec![None, None])]).unwrap();
        let summary = Profiler::default().summarize(&table);
        let stats = summary.numeric_summary("empty").unwrap();
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_nan());
        assert!(stats.min.is_nan());
        assert!(stats.q75.is_nan());
    }

    #[test]
    fn test_top_k_ties_resolve_by_first_seen() {
        let column = Column::texts(
            "tag",
            vec![Some("z"), Some("y"), Some("x"), Some("y"), Some("z"), Some("x")],
        );
        let summary = summarize_categorical(&column, 3);
        let order: Vec<&str> = summary.top_values.iter().map(|v| v.value.as_str()).collect();
        assert_eq!(order, vec!["z", "y", "x"]);
    }

    #[test]
    fn test_categorical_profile_limit() {
        let columns = (0..7)
            .map(|i| Column::texts(format!("c{}", i), vec![Some("v")]))
            .collect();
        let table = Table::new(columns).unwrap();
        let summary = Profiler::default().summarize(&table);
        assert_eq!(summary.categorical.len(), 5);
        assert_eq!(summary.categorical[4].column, "c4");
    }

    #[test]
    fn test_summary_is_reproducible() {
        let table = sample_table();
        let profiler = Profiler::default();
        let first = serde_json::to_string(&profiler.summarize(&table)).unwrap();
        let second = serde_json::to_string(&profiler.summarize(&table)).unwrap();
        assert_eq!(first, second);
    }
}
