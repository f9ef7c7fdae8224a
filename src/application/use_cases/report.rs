// ============================================================
// REPORT RENDERER
// ============================================================
// Plain-text analysis report. No timestamps: the same table always
// renders to the same bytes.

use std::fmt::Write;

use super::insights::InsightGenerator;
use super::profiler::Profiler;
use super::schema_inference::SchemaInferer;
use super::statistics::group_thousands;
use crate::domain::analysis::{AnalysisConfig, Insight, SummaryStats};
use crate::domain::table::Table;

const RULE_WIDTH: usize = 50;
const SECTION_RULE_WIDTH: usize = 20;

pub struct ReportRenderer {
    config: AnalysisConfig,
}

impl ReportRenderer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn render_report(&self, table: &Table) -> String {
        let classification =
            SchemaInferer::new(self.config.datetime_sample_size).classify(table);
        let summary = Profiler::new(self.config.clone()).summarize_with(table, &classification);
        let insights = InsightGenerator::new(self.config.clone()).generate_insights(
            table,
            &classification.numeric,
            &classification.categorical,
        );

        let mut sections: Vec<(String, Vec<String>)> = vec![
            ("DATASET OVERVIEW".to_string(), overview_lines(&summary)),
            ("COLUMN TYPES".to_string(), column_type_lines(&summary)),
        ];

        if summary.missing_value_count > 0 {
            sections.push(("MISSING DATA".to_string(), missing_lines(&summary)));
        }
        if !summary.numeric.is_empty() {
            sections.push(("NUMERIC COLUMNS SUMMARY".to_string(), numeric_lines(&summary)));
        }
        if !summary.categorical.is_empty() {
            sections.push((
                "CATEGORICAL COLUMNS SUMMARY".to_string(),
                categorical_lines(&summary),
            ));
        }
        if !insights.is_empty() {
            sections.push(("KEY INSIGHTS".to_string(), insight_lines(&insights)));
        }

        let mut out = String::new();
        let rule = "=".repeat(RULE_WIDTH);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "DataLoom - Data Analysis Report");
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out);

        for (index, (title, lines)) in sections.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", index + 1, title);
            let _ = writeln!(out, "{}", "-".repeat(SECTION_RULE_WIDTH));
            for line in lines {
                let _ = writeln!(out, "{}", line);
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "End of report");
        let _ = writeln!(out, "{}", rule);
        out
    }
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

fn overview_lines(summary: &SummaryStats) -> Vec<String> {
    vec![
        format!("Rows: {}", group_thousands(summary.row_count)),
        format!("Columns: {}", summary.column_count),
        format!("Size: {}", format_bytes(summary.estimated_size_bytes)),
    ]
}

fn column_type_lines(summary: &SummaryStats) -> Vec<String> {
    vec![
        format!("Numeric: {}", summary.column_types.numeric),
        format!("Categorical: {}", summary.column_types.categorical),
        format!("DateTime: {}", summary.column_types.datetime),
    ]
}

fn missing_lines(summary: &SummaryStats) -> Vec<String> {
    let mut lines = vec![format!(
        "Total missing values: {}",
        group_thousands(summary.missing_value_count)
    )];
    for column in summary.columns.iter().filter(|c| c.null_count > 0) {
        let pct = if summary.row_count == 0 {
            0.0
        } else {
            column.null_count as f64 / summary.row_count as f64 * 100.0
        };
        lines.push(format!(
            "{}: {} ({:.2}%)",
            column.name,
            group_thousands(column.null_count),
            pct
        ));
    }
    lines
}

fn numeric_lines(summary: &SummaryStats) -> Vec<String> {
    summary
        .numeric
        .iter()
        .map(|stats| {
            format!(
                "{}: mean={}, median={}, std={}, min={}, max={}",
                stats.column,
                format_stat(stats.mean),
                format_stat(stats.median),
                format_stat(stats.std),
                format_stat(stats.min),
                format_stat(stats.max)
            )
        })
        .collect()
}

fn categorical_lines(summary: &SummaryStats) -> Vec<String> {
    summary
        .categorical
        .iter()
        .map(|stats| {
            let top = stats
                .top_values
                .first()
                .map(|freq| format!("{} ({})", freq.value, freq.count))
                .unwrap_or_else(|| "n/a".to_string());
            format!(
                "{}: {} unique values, most frequent: {}",
                stats.column, stats.unique_count, top
            )
        })
        .collect()
}

fn insight_lines(insights: &[Insight]) -> Vec<String> {
    insights
        .iter()
        .map(|insight| format!("- {}: {}", insight.category, insight.message))
        .collect()
}

fn format_stat(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.2}", value)
    }
}

fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let value = bytes as f64;
    if value >= MB {
        format!("{:.1} MB", value / MB)
    } else if value >= KB {
        format!("{:.1} KB", value / KB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::Column;

    fn table() -> Table {
        Table::new(vec![
            Column::integers("amount", vec![Some(10), Some(20), Some(30), None]),
            Column::texts("category", vec![Some("a"), Some("a"), Some("b"), Some("c")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_sections_in_order() {
        let report = ReportRenderer::default().render_report(&table());

        let positions: Vec<usize> = [
            "DataLoom - Data Analysis Report",
            "1. DATASET OVERVIEW",
            "2. COLUMN TYPES",
            "3. MISSING DATA",
            "4. NUMERIC COLUMNS SUMMARY",
            "5. CATEGORICAL COLUMNS SUMMARY",
            "6. KEY INSIGHTS",
            "End of report",
        ]
        .iter()
        .map(|needle| report.find(needle).expect(needle))
        .collect();

        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(report.contains("amount: mean=20.00, median=20.00, std=10.00, min=10.00, max=30.00"));
        assert!(report.contains("category: 3 unique values, most frequent: a (2)"));
        assert!(report.contains("amount: 1 (25.00%)"));
    }

    #[test]
    fn test_optional_sections_omitted() {
        let table = Table::new(vec![Column::texts("name", vec![Some("x"), Some("y")])]).unwrap();
        let report = ReportRenderer::default().render_report(&table);

        assert!(!report.contains("MISSING DATA"));
        assert!(!report.contains("NUMERIC COLUMNS SUMMARY"));
        assert!(report.contains("3. CATEGORICAL COLUMNS SUMMARY"));
        assert!(report.contains("4. KEY INSIGHTS"));
    }

    #[test]
    fn test_report_is_byte_identical() {
        let renderer = ReportRenderer::default();
        assert_eq!(renderer.render_report(&table()), renderer.render_report(&table()));
    }

    #[test]
    fn test_empty_table_report() {
        let report = ReportRenderer::default().render_report(&Table::empty());
        assert!(report.contains("Rows: 0"));
        assert!(report.contains("No missing values were detected."));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.0 KB");
    }
}
