use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    /// Expected-absent records. Storage lookups model "no such file" as
    /// `Ok(None)`; this variant is for callers that require presence.
    NotFound(String),
    ValidationError(String),
    AlreadyExists(String),
    DecodeError(String),
    BackendUnavailable(String),
    ParseError(String),
    SecurityError(String),
    DatabaseError(String),
    IoError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::AlreadyExists(msg) => write!(f, "Already exists: {}", msg),
            AppError::DecodeError(msg) => write!(f, "Decode error: {}", msg),
            AppError::BackendUnavailable(msg) => write!(f, "Storage backend unavailable: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::SecurityError(msg) => write!(f, "Security error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        classify_sqlx_error(err, "Database operation failed")
    }
}

/// Sort a sqlx failure into the error kind callers branch on.
///
/// Unique violations become `AlreadyExists` and foreign-key violations
/// `ValidationError`. Connectivity and pool exhaustion become
/// `BackendUnavailable`. The rest is a plain database error.
pub fn classify_sqlx_error(err: sqlx::Error, context: &str) -> AppError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::AlreadyExists(format!("{}: {}", context, db_err.message()))
        }
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            AppError::ValidationError(format!("{}: {}", context, db_err.message()))
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => {
            AppError::BackendUnavailable(format!("{}: {}", context, err))
        }
        other => AppError::DatabaseError(format!("{}: {}", context, other)),
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_backend_unavailable() {
        let err = classify_sqlx_error(sqlx::Error::PoolTimedOut, "Failed to save file");
        assert!(matches!(err, AppError::BackendUnavailable(_)));
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        let err = classify_sqlx_error(sqlx::Error::RowNotFound, "Failed to load file");
        assert!(matches!(err, AppError::DatabaseError(_)));
        assert!(err.to_string().starts_with("Database error: Failed to load file"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err: AppError = io.into();
        assert_eq!(err, AppError::IoError("disk gone".to_string()));
    }
}
