// ============================================================
// SCHEMA INFERENCE
// ============================================================
// Partition columns into numeric / categorical / datetime-like working sets.
// Datetime detection is a sampling heuristic for presentation hints only;
// nothing downstream coerces storage types from it.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::domain::analysis::ColumnClassification;
use crate::domain::table::{Cell, Column, ColumnKind, Table};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Classifies table columns; pure function of the table
pub struct SchemaInferer {
    sample_size: usize,
}

impl SchemaInferer {
    pub fn new(sample_size: usize) -> Self {
        Self {
            sample_size: sample_size.max(1),
        }
    }

    pub fn classify(&self, table: &Table) -> ColumnClassification {
        let mut classification = ColumnClassification::default();

        for column in table.columns() {
            match column.kind {
                ColumnKind::Integer | ColumnKind::Float => {
                    classification.numeric.push(column.name.clone())
                }
                ColumnKind::Text if self.is_datetime_like(column) => {
                    classification.datetime.push(column.name.clone())
                }
                ColumnKind::Text | ColumnKind::Boolean => {
                    classification.categorical.push(column.name.clone())
                }
            }
        }

        classification
    }

    /// True when every value in a head sample of non-missing text parses
    /// as a calendar timestamp. An empty sample is not datetime-like.
    pub fn is_datetime_like(&self, column: &Column) -> bool {
        if column.kind != ColumnKind::Text {
            return false;
        }

        let sample: Vec<&str> = column
            .values
            .iter()
            .filter(|cell| !cell.is_missing())
            .filter_map(|cell| match cell {
                Cell::Text(s) => Some(s.trim()),
                _ => None,
            })
            .take(self.sample_size)
            .collect();

        !sample.is_empty() && sample.iter().all(|value| parse_timestamp(value).is_some())
    }
}

impl Default for SchemaInferer {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Permissive timestamp parser: RFC 3339 / RFC 2822, then common
/// datetime and date layouts.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.naive_utc());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(vec![
            Column::integers("id", vec![Some(1), Some(2), Some(3)]),
            Column::floats("price", vec![Some(1.5), None, Some(2.0)]),
            Column::texts("city", vec![Some("Oslo"), Some("Lima"), None]),
            Column::texts(
                "ordered_at",
                vec![Some("2024-01-05"), None, Some("2024-02-11 08:30:00")],
            ),
            Column::booleans("paid", vec![Some(true), Some(false), None]),
        ])
        .unwrap()
    }

    #[test]
    fn test_classify_partitions_every_column_once() {
        let classification = SchemaInferer::default().classify(&table());
        assert_eq!(classification.numeric, vec!["id", "price"]);
        assert_eq!(classification.datetime, vec!["ordered_at"]);
        assert_eq!(classification.categorical, vec!["city", "paid"]);
    }

    #[test]
    fn test_single_parse_failure_excludes_column() {
        let column = Column::texts(
            "when",
            vec![Some("2024-01-05"), Some("soon"), Some("2024-01-07")],
        );
        assert!(!SchemaInferer::default().is_datetime_like(&column));
    }

    #[test]
    fn test_failure_outside_sample_is_not_seen() {
        let column = Column::texts("when", vec![Some("2024-01-05"), Some("not a date")]);
        assert!(SchemaInferer::new(1).is_datetime_like(&column));
    }

    #[test]
    fn test_all_null_column_is_not_datetime() {
        let column = Column::texts("when", vec![None::<&str>, None]);
        assert!(!SchemaInferer::default().is_datetime_like(&column));
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2023-07-01T12:00:00Z").is_some());
        assert!(parse_timestamp("07/01/2023").is_some());
        assert!(parse_timestamp("Jul 01, 2023").is_some());
        assert!(parse_timestamp("hello").is_none());
    }
}
