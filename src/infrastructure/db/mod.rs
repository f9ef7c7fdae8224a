//! Catalog storage over two interchangeable relational backends.
//!
//! [`FileStore`] is the single contract; [`sqlite::SqliteStore`] (embedded
//! file) and [`postgres::PostgresStore`] (client-server) implement it and are
//! chosen once, at construction, from configuration.
//!
//! Table payloads are encoded by the codec before they reach SQL and
//! decoded on the way out; `compressed_data` is the only durable copy.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::catalog::{FileType, StoredFile, User, UserPreferences};
use crate::domain::error::{classify_sqlx_error, AppError, Result};
use crate::domain::table::Table;
use crate::infrastructure::codec;
use crate::infrastructure::config::{AppConfig, StorageTarget};

pub mod postgres;
pub mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Postgres,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Sqlite => write!(f, "sqlite"),
            StorageBackend::Postgres => write!(f, "postgres"),
        }
    }
}

/// Pool sizing shared by both backends
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&AppConfig> for PoolConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }
}

#[async_trait]
pub trait FileStore: Send + Sync {
    fn backend(&self) -> StorageBackend;

    /// Create tables if absent and apply additive migrations. Idempotent.
    async fn init_schema(&self) -> Result<()>;

    async fn health_check(&self) -> Result<()>;

    /// Normalizes username and email, stores an argon2 hash and default
    /// preferences in one transaction. Collisions are `AlreadyExists`.
    async fn create_user(&self, username: &str, email: &str, password: &str) -> Result<User>;

    /// `Ok(None)` for any credential failure; `last_login` is stamped on success
    async fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>>;

    /// Cascades to the user's files and preferences
    async fn delete_user(&self, user_id: i64) -> Result<bool>;

    async fn save_file(
        &self,
        owner_id: i64,
        filename: &str,
        table: &Table,
        file_type: FileType,
    ) -> Result<i64>;

    /// Metadata only, newest upload first
    async fn list_files(&self, owner_id: i64) -> Result<Vec<StoredFile>>;

    /// `Ok(None)` when the id is absent
    async fn load_file(&self, file_id: i64) -> Result<Option<Table>>;

    /// Like `load_file`, but another owner's file reads as absent
    async fn load_owned_file(&self, file_id: i64, owner_id: i64) -> Result<Option<Table>>;

    /// Deletes only when `owner_id` owns the file
    async fn delete_file(&self, file_id: i64, owner_id: i64) -> Result<bool>;

    async fn get_preferences(&self, user_id: i64) -> Result<UserPreferences>;

    async fn update_preferences(&self, user_id: i64, preferences: &UserPreferences) -> Result<()>;
}

/// Connect the configured backend and make sure its schema exists
pub async fn connect_store(config: &AppConfig) -> Result<Arc<dyn FileStore>> {
    let pool_config = PoolConfig::from(config);

    let store: Arc<dyn FileStore> = match config.storage_target()? {
        StorageTarget::Sqlite { url } => Arc::new(SqliteStore::connect(&url, &pool_config).await?),
        StorageTarget::Postgres { url } => {
            Arc::new(PostgresStore::connect(&url, &pool_config).await?)
        }
    };

    info!(backend = %store.backend(), "Catalog store ready");
    Ok(store)
}

/// Encoded payload plus the catalog metadata recorded beside it
pub(crate) struct EncodedUpload {
    pub payload: String,
    pub file_size: i64,
    pub rows_count: i64,
    pub columns_count: i64,
}

impl EncodedUpload {
    pub fn new(table: &Table) -> Result<Self> {
        let payload = codec::encode(table)?;
        Ok(Self {
            file_size: payload.len() as i64,
            rows_count: table.row_count() as i64,
            columns_count: table.column_count() as i64,
            payload,
        })
    }
}

pub(crate) fn validate_filename(filename: &str) -> Result<&str> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(
            "Filename must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Decode a fetched `compressed_data` cell; a row without payload is corrupt
pub(crate) fn decode_payload(file_id: i64, payload: Option<String>) -> Result<Table> {
    match payload {
        Some(payload) => codec::decode(&payload),
        None => Err(AppError::DecodeError(format!(
            "Stored file {} has no payload",
            file_id
        ))),
    }
}

/// Give signup collisions a message that names what collided
pub(crate) fn user_conflict(err: sqlx::Error, username: &str, email: &str) -> AppError {
    match classify_sqlx_error(err, "Failed to create user") {
        AppError::AlreadyExists(_) => AppError::AlreadyExists(format!(
            "A user with username '{}' or email '{}' already exists",
            username, email
        )),
        other => other,
    }
}

// Internal entities for database mapping

#[derive(sqlx::FromRow)]
pub(crate) struct UserEntity {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<UserEntity> for User {
    fn from(e: UserEntity) -> Self {
        Self {
            id: e.id,
            username: e.username,
            email: e.email,
            created_at: e.created_at,
            last_login: e.last_login,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct StoredFileEntity {
    pub id: i64,
    pub user_id: i64,
    pub filename: String,
    pub file_size: i64,
    pub upload_date: DateTime<Utc>,
    pub rows_count: i64,
    pub columns_count: i64,
    pub file_type: String,
}

impl TryFrom<StoredFileEntity> for StoredFile {
    type Error = AppError;

    fn try_from(e: StoredFileEntity) -> Result<Self> {
        Ok(Self {
            id: e.id,
            owner_id: e.user_id,
            filename: e.filename,
            upload_date: e.upload_date,
            file_size: e.file_size,
            rows_count: e.rows_count,
            columns_count: e.columns_count,
            file_type: FileType::parse(&e.file_type)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PreferencesEntity {
    pub theme: String,
    pub default_chart_type: String,
    pub timezone: String,
}

impl From<PreferencesEntity> for UserPreferences {
    fn from(e: PreferencesEntity) -> Self {
        Self {
            theme: e.theme,
            default_chart_type: e.default_chart_type,
            timezone: e.timezone,
        }
    }
}

/// Split a schema script into statements
pub(crate) fn split_sql_statements(script: &str) -> impl Iterator<Item = &str> {
    script.split(';').map(str::trim).filter(|stmt| !stmt.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::Column;

    #[test]
    fn test_encoded_upload_metadata() {
        let table = Table::new(vec![
            Column::integers("a", vec![Some(1), Some(2), Some(3)]),
            Column::texts("b", vec![Some("x"), None, Some("z")]),
        ])
        .unwrap();
        let upload = EncodedUpload::new(&table).unwrap();
        assert_eq!(upload.rows_count, 3);
        assert_eq!(upload.columns_count, 2);
        assert_eq!(upload.file_size, upload.payload.len() as i64);
    }

    #[test]
    fn test_missing_payload_is_decode_error() {
        assert!(matches!(
            decode_payload(7, None),
            Err(AppError::DecodeError(_))
        ));
    }

    #[test]
    fn test_split_sql_statements() {
        let statements: Vec<&str> =
            split_sql_statements("CREATE TABLE a (x INT);\n\n CREATE INDEX i ON a (x);\n").collect();
        assert_eq!(statements, vec!["CREATE TABLE a (x INT)", "CREATE INDEX i ON a (x)"]);
    }

    #[test]
    fn test_blank_filename_rejected() {
        assert!(validate_filename("   ").is_err());
        assert_eq!(validate_filename(" sales.csv ").unwrap(), "sales.csv");
    }
}
