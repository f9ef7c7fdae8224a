use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Csv,
    Excel,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Csv => "csv",
            FileType::Excel => "excel",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(FileType::Csv),
            "excel" => Ok(FileType::Excel),
            other => Err(AppError::ValidationError(format!(
                "Unknown file type: {}",
                other
            ))),
        }
    }

    /// Pick the file type from an upload's extension
    pub fn from_filename(filename: &str) -> Result<Self> {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            Ok(FileType::Csv)
        } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") || lower.ends_with(".ods")
        {
            Ok(FileType::Excel)
        } else {
            Err(AppError::ValidationError(format!(
                "Unsupported file extension: {} (expected .csv, .xlsx, .xls or .ods)",
                filename
            )))
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry for a stored table. Listing never carries the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: i64,
    pub owner_id: i64,
    pub filename: String,
    pub upload_date: DateTime<Utc>,
    /// Length of the encoded payload in bytes
    pub file_size: i64,
    pub rows_count: i64,
    pub columns_count: i64,
    pub file_type: FileType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub theme: String,
    pub default_chart_type: String,
    pub timezone: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            default_chart_type: "plotly".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

impl UserPreferences {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("theme", &self.theme),
            ("default_chart_type", &self.default_chart_type),
            ("timezone", &self.timezone),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::ValidationError(format!(
                    "Preference '{}' must not be empty",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// Explicit per-request caller identity, passed into every session-scoped call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: i64,
}

impl SessionContext {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }
}
