// ============================================================
// ANALYSIS TYPES
// ============================================================
// Value objects produced by profiling, insight and outlier passes.
// All of them are derived per call and never persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::table::ColumnKind;

/// Working column sets used by every downstream pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnClassification {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    pub datetime: Vec<String>,
}

impl ColumnClassification {
    pub fn counts(&self) -> ColumnTypeCounts {
        ColumnTypeCounts {
            numeric: self.numeric.len(),
            categorical: self.categorical.len(),
            datetime: self.datetime.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTypeCounts {
    pub numeric: usize,
    pub categorical: usize,
    pub datetime: usize,
}

/// Descriptive statistics for one numeric column.
///
/// Every field except `count` is NaN when the column has no usable values;
/// `std` is also NaN for a single value (sample deviation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueFrequency {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalSummary {
    pub column: String,
    pub unique_count: usize,
    /// Most frequent first; ties keep first-seen order
    pub top_values: Vec<ValueFrequency>,
}

/// Per-column shape information shown in upload previews
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub non_null_count: usize,
    pub null_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub row_count: usize,
    pub column_count: usize,
    pub missing_value_count: usize,
    pub estimated_size_bytes: usize,
    pub column_types: ColumnTypeCounts,
    pub columns: Vec<ColumnProfile>,
    pub numeric: Vec<NumericSummary>,
    pub categorical: Vec<CategoricalSummary>,
}

impl SummaryStats {
    pub fn numeric_summary(&self, column: &str) -> Option<&NumericSummary> {
        self.numeric.iter().find(|s| s.column == column)
    }

    pub fn categorical_summary(&self, column: &str) -> Option<&CategoricalSummary> {
        self.categorical.iter().find(|s| s.column == column)
    }
}

/// Insight categories, declared in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InsightCategory {
    Overview,
    DataQuality,
    DataQualityIssue,
    Correlation,
    Cardinality,
}

impl InsightCategory {
    pub fn label(&self) -> &'static str {
        match self {
            InsightCategory::Overview => "Overview",
            InsightCategory::DataQuality => "Data Quality",
            InsightCategory::DataQualityIssue => "Data Quality Issue",
            InsightCategory::Correlation => "Correlation",
            InsightCategory::Cardinality => "Data Cardinality",
        }
    }
}

impl fmt::Display for InsightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub category: InsightCategory,
    pub message: String,
}

impl Insight {
    pub fn new(category: InsightCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

/// Tukey-fence result for one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierStats {
    pub count: usize,
    pub percentage: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

pub type OutlierReport = BTreeMap<String, OutlierStats>;

/// Square Pearson matrix over numeric columns, NaN where undefined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

/// Thresholds that drive profiling and insight policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Non-null values sampled per text column for datetime detection (default: 10)
    pub datetime_sample_size: usize,

    /// Categorical columns profiled in the summary (default: 5)
    pub categorical_profile_limit: usize,

    /// Most frequent values kept per categorical column (default: 3)
    pub top_k: usize,

    /// Absolute correlation above which a pair counts as highly correlated (default: 0.8)
    pub high_correlation_threshold: f64,

    /// Distinct values a column must exceed to be high-cardinality (default: 50)
    pub cardinality_floor: usize,

    /// Distinct/row ratio a column must exceed to be high-cardinality (default: 0.5)
    pub cardinality_ratio: f64,

    /// Missing-cell percentage below which missing data is "low" (default: 5.0)
    pub low_missing_pct: f64,

    /// Tukey fence multiplier (default: 1.5)
    pub iqr_multiplier: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            datetime_sample_size: 10,
            categorical_profile_limit: 5,
            top_k: 3,
            high_correlation_threshold: 0.8,
            cardinality_floor: 50,
            cardinality_ratio: 0.5,
            low_missing_pct: 5.0,
            iqr_multiplier: 1.5,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.datetime_sample_size == 0 {
            return Err("datetime_sample_size must be > 0".to_string());
        }
        if self.top_k == 0 {
            return Err("top_k must be > 0".to_string());
        }
        if !(0.0..1.0).contains(&self.high_correlation_threshold) {
            return Err("high_correlation_threshold must be in [0.0, 1.0)".to_string());
        }
        if !(0.0..=1.0).contains(&self.cardinality_ratio) {
            return Err("cardinality_ratio must be between 0.0 and 1.0".to_string());
        }
        if !(0.0..=100.0).contains(&self.low_missing_pct) {
            return Err("low_missing_pct must be between 0 and 100".to_string());
        }
        if !(self.iqr_multiplier > 0.0) {
            return Err("iqr_multiplier must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_ratio() {
        let config = AnalysisConfig {
            cardinality_ratio: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_insight_categories_sort_in_emission_order() {
        let mut categories = vec![
            InsightCategory::Cardinality,
            InsightCategory::Overview,
            InsightCategory::Correlation,
            InsightCategory::DataQuality,
        ];
        categories.sort();
        assert_eq!(categories[0], InsightCategory::Overview);
        assert_eq!(categories[3], InsightCategory::Cardinality);
    }
}
