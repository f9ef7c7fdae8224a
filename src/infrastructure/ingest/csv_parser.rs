// ============================================================
// CSV PARSER
// ============================================================
// Parse CSV uploads with encoding fallback and delimiter detection

use std::borrow::Cow;

use csv::{ReaderBuilder, Trim};
use encoding_rs::{UTF_8, WINDOWS_1252};
use tracing::debug;

use super::{normalize_headers, RawGrid, RawValue};
use crate::domain::error::{AppError, Result};

const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];
const SNIFF_LINES: usize = 10;
const SNIFF_BYTES: usize = 64 * 1024;

/// CSV parser producing untyped cells
pub struct CsvParser {
    delimiter: u8,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self {
            delimiter: b',',
        }
    }
}

impl CsvParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parser configured with the delimiter sniffed from the first lines
    pub fn auto_detect(bytes: &[u8]) -> Self {
        let sample = &bytes[..bytes.len().min(SNIFF_BYTES)];
        let delimiter = Self::detect_delimiter(&String::from_utf8_lossy(sample));
        debug!(delimiter = %(delimiter as char).escape_default(), "Detected CSV delimiter");
        Self::default().with_delimiter(delimiter)
    }

    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<RawGrid> {
        let content = decode_text(bytes);
        self.parse_content(&content)
    }

    /// Header row first; empty fields become `Missing`
    pub fn parse_content(&self, content: &str) -> Result<RawGrid> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        if headers.is_empty() {
            return Err(AppError::ParseError("CSV file has no header row".to_string()));
        }
        let width = headers.len();

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;

            if record.len() > width {
                return Err(AppError::ParseError(format!(
                    "CSV row {} has {} fields, the header has {}",
                    index + 1,
                    record.len(),
                    width
                )));
            }

            let mut row: Vec<RawValue> = record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        RawValue::Missing
                    } else {
                        RawValue::Text(field.to_string())
                    }
                })
                .collect();
            row.resize(width, RawValue::Missing);
            rows.push(row);
        }

        Ok(RawGrid {
            headers: normalize_headers(headers),
            rows,
        })
    }

    /// Detect delimiter from content (comma, semicolon, tab, pipe)
    pub fn detect_delimiter(content: &str) -> u8 {
        let sample_lines: Vec<&str> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(SNIFF_LINES)
            .collect();
        if sample_lines.is_empty() {
            return b',';
        }

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        for &delimiter in &DELIMITER_CANDIDATES {
            let field_counts: Vec<usize> = sample_lines
                .iter()
                .map(|line| line.bytes().filter(|&b| b == delimiter).count())
                .collect();

            // Score by frequency, penalized by inconsistency between lines
            let avg = field_counts.iter().sum::<usize>() as f32 / field_counts.len() as f32;
            let variance = field_counts
                .iter()
                .map(|&x| (x as f32 - avg).powi(2))
                .sum::<f32>()
                / field_counts.len() as f32;
            let score = avg / (1.0 + variance.sqrt());

            if score > best_score {
                best_score = score;
                best_delimiter = delimiter;
            }
        }

        best_delimiter
    }
}

/// UTF-8 (BOM stripped) when valid, otherwise Windows-1252
fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (text, had_errors) = UTF_8.decode_with_bom_removal(bytes);
    if !had_errors {
        return text;
    }
    debug!("Upload is not valid UTF-8, decoding as Windows-1252");
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_csv() {
        let content = "name,age,city\nAlice,30,NYC\nBob,,LA";
        let grid = CsvParser::new().parse_content(content).unwrap();

        assert_eq!(grid.headers, vec!["name", "age", "city"]);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[0][0], RawValue::Text("Alice".to_string()));
        assert_eq!(grid.rows[1][1], RawValue::Missing);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let grid = CsvParser::new().parse_content("a,b,c\n1,2\n").unwrap();
        assert_eq!(grid.rows[0].len(), 3);
        assert_eq!(grid.rows[0][2], RawValue::Missing);
    }

    #[test]
    fn test_long_rows_rejected() {
        let result = CsvParser::new().parse_content("a,b\n1,2,3\n");
        assert!(matches!(result, Err(AppError::ParseError(_))));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(CsvParser::detect_delimiter("a,b,c\nd,e,f"), b',');
        assert_eq!(CsvParser::detect_delimiter("a;b;c\nd;e;f"), b';');
        assert_eq!(CsvParser::detect_delimiter("a\tb\nc\td"), b'\t');
        assert_eq!(CsvParser::detect_delimiter("a|b|c\n1|2|3"), b'|');
    }

    #[test]
    fn test_latin1_fallback() {
        // "café" in Windows-1252
        let bytes = b"name\ncaf\xe9\n";
        let grid = CsvParser::new().parse_bytes(bytes).unwrap();
        assert_eq!(grid.rows[0][0], RawValue::Text("café".to_string()));
    }

    #[test]
    fn test_bom_is_stripped() {
        let bytes = b"\xef\xbb\xbfid\n1\n";
        let grid = CsvParser::new().parse_bytes(bytes).unwrap();
        assert_eq!(grid.headers, vec!["id"]);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(CsvParser::new().parse_content("").is_err());
    }
}
