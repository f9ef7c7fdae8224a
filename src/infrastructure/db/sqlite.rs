use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteSynchronous,
};
use tracing::{debug, info};

use super::{
    decode_payload, split_sql_statements, user_conflict, validate_filename, EncodedUpload,
    FileStore, PoolConfig, PreferencesEntity, StorageBackend, StoredFileEntity, UserEntity,
};
use crate::domain::catalog::{FileType, StoredFile, User, UserPreferences};
use crate::domain::error::{classify_sqlx_error, AppError, Result};
use crate::domain::table::Table;
use crate::infrastructure::security::credentials::{normalize_identity, validate_signup};
use crate::infrastructure::security::password::PasswordManager;

const SQLITE_SCHEMA: &str = include_str!("../../../resources/schema/sqlite.sql");

/// Version 1 had only the base tables; 2 added payload and file type columns
/// and rebuilt tables created by the first release of the catalog.
const CURRENT_SCHEMA_VERSION: i64 = 2;

/// Embedded single-file catalog
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    passwords: Arc<PasswordManager>,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `database_url` and apply the schema
    pub async fn connect(database_url: &str, config: &PoolConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::ValidationError(format!("Failed to parse SQLite URL: {}", e))
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(options)
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to connect SQLite catalog"))?;

        let store = Self {
            pool,
            passwords: Arc::new(PasswordManager::new()),
        };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn schema_version(&self) -> Result<i64> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to acquire catalog connection"))?;
        read_user_version(&mut conn).await
    }

    async fn fetch_payload(&self, file_id: i64, owner_id: Option<i64>) -> Result<Option<Table>> {
        let row: Option<(Option<String>,)> = match owner_id {
            Some(owner_id) => {
                sqlx::query_as("SELECT compressed_data FROM user_files WHERE id = ? AND user_id = ?")
                    .bind(file_id)
                    .bind(owner_id)
                    .fetch_optional(&self.pool)
                    .await
            }
            None => {
                sqlx::query_as("SELECT compressed_data FROM user_files WHERE id = ?")
                    .bind(file_id)
                    .fetch_optional(&self.pool)
                    .await
            }
        }
        .map_err(|e| classify_sqlx_error(e, "Failed to load file"))?;

        match row {
            Some((payload,)) => decode_payload(file_id, payload).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl FileStore for SqliteStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Sqlite
    }

    async fn init_schema(&self) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to begin schema transaction"))?;

        let version = read_user_version(&mut tx).await?;
        if version > CURRENT_SCHEMA_VERSION {
            return Err(AppError::DatabaseError(format!(
                "Catalog schema version {} is newer than supported version {}",
                version, CURRENT_SCHEMA_VERSION
            )));
        }

        let detached = if version < CURRENT_SCHEMA_VERSION {
            detach_legacy_tables(&mut tx).await?
        } else {
            Vec::new()
        };

        apply_base_schema(&mut tx).await?;

        if !detached.is_empty() {
            for table in &detached {
                restore_legacy_rows(&mut tx, *table).await?;
            }
            // Indexes followed the renamed tables and were dropped with them
            apply_base_schema(&mut tx).await?;
        }

        if version < CURRENT_SCHEMA_VERSION {
            write_user_version(&mut tx, CURRENT_SCHEMA_VERSION).await?;
        }

        tx.commit()
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to commit catalog schema"))?;

        if version < CURRENT_SCHEMA_VERSION {
            info!(from = version, to = CURRENT_SCHEMA_VERSION, "Catalog schema migrated");
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::BackendUnavailable(format!("SQLite health check failed: {}", e)))?;
        Ok(())
    }

    async fn create_user(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let creds = validate_signup(username, email, password)?;
        let password_hash = self.passwords.hash(password)?;
        let now = Utc::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to begin transaction"))?;

        let entity = sqlx::query_as::<_, UserEntity>(
            "INSERT INTO users (username, email, password_hash, created_at)
             VALUES (?, ?, ?, ?)
             RETURNING id, username, email, password_hash, created_at, last_login",
        )
        .bind(&creds.username)
        .bind(&creds.email)
        .bind(&password_hash)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| user_conflict(e, &creds.username, &creds.email))?;

        let defaults = UserPreferences::default();
        sqlx::query(
            "INSERT INTO user_preferences (user_id, theme, default_chart_type, timezone)
             VALUES (?, ?, ?, ?)",
        )
        .bind(entity.id)
        .bind(&defaults.theme)
        .bind(&defaults.default_chart_type)
        .bind(&defaults.timezone)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify_sqlx_error(e, "Failed to create default preferences"))?;

        tx.commit()
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to commit user creation"))?;

        info!(user_id = entity.id, username = %entity.username, "User created");
        Ok(entity.into())
    }

    async fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
        let username = normalize_identity(username);
        let entity = sqlx::query_as::<_, UserEntity>(
            "SELECT id, username, email, password_hash, created_at, last_login
             FROM users WHERE username = ?",
        )
        .bind(&username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify_sqlx_error(e, "Failed to look up user"))?;

        let Some(mut entity) = entity else {
            self.passwords.verify_dummy(password);
            debug!("Login rejected");
            return Ok(None);
        };
        if !self.passwords.verify(password, &entity.password_hash) {
            debug!("Login rejected");
            return Ok(None);
        }

        let now = Utc::now();
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(now)
            .bind(entity.id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to record login"))?;
        entity.last_login = Some(now);

        info!(user_id = entity.id, "User logged in");
        Ok(Some(entity.into()))
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to delete user"))?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(user_id, "User deleted");
        }
        Ok(deleted)
    }

    async fn save_file(
        &self,
        owner_id: i64,
        filename: &str,
        table: &Table,
        file_type: FileType,
    ) -> Result<i64> {
        let filename = validate_filename(filename)?;
        let upload = EncodedUpload::new(table)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to begin transaction"))?;

        let file_id: i64 = sqlx::query_scalar(
            "INSERT INTO user_files
                (user_id, filename, file_size, upload_date, rows_count, columns_count, file_type, compressed_data)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(owner_id)
        .bind(filename)
        .bind(upload.file_size)
        .bind(Utc::now())
        .bind(upload.rows_count)
        .bind(upload.columns_count)
        .bind(file_type.as_str())
        .bind(&upload.payload)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify_sqlx_error(e, "Failed to save file"))?;

        tx.commit()
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to commit file save"))?;

        info!(
            file_id,
            owner_id,
            rows = upload.rows_count,
            columns = upload.columns_count,
            bytes = upload.file_size,
            "File saved"
        );
        Ok(file_id)
    }

    async fn list_files(&self, owner_id: i64) -> Result<Vec<StoredFile>> {
        let entities = sqlx::query_as::<_, StoredFileEntity>(
            "SELECT id, user_id, filename, file_size, upload_date, rows_count, columns_count, file_type
             FROM user_files
             WHERE user_id = ?
             ORDER BY upload_date DESC, id DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify_sqlx_error(e, "Failed to list files"))?;

        entities.into_iter().map(StoredFile::try_from).collect()
    }

    async fn load_file(&self, file_id: i64) -> Result<Option<Table>> {
        self.fetch_payload(file_id, None).await
    }

    async fn load_owned_file(&self, file_id: i64, owner_id: i64) -> Result<Option<Table>> {
        self.fetch_payload(file_id, Some(owner_id)).await
    }

    async fn delete_file(&self, file_id: i64, owner_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_files WHERE id = ? AND user_id = ?")
            .bind(file_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to delete file"))?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(file_id, owner_id, "File deleted");
        }
        Ok(deleted)
    }

    async fn get_preferences(&self, user_id: i64) -> Result<UserPreferences> {
        let entity = sqlx::query_as::<_, PreferencesEntity>(
            "SELECT theme, default_chart_type, timezone FROM user_preferences WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify_sqlx_error(e, "Failed to load preferences"))?;

        Ok(entity.map(UserPreferences::from).unwrap_or_default())
    }

    async fn update_preferences(&self, user_id: i64, preferences: &UserPreferences) -> Result<()> {
        preferences.validate()?;
        sqlx::query(
            "INSERT INTO user_preferences (user_id, theme, default_chart_type, timezone)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                theme = excluded.theme,
                default_chart_type = excluded.default_chart_type,
                timezone = excluded.timezone",
        )
        .bind(user_id)
        .bind(&preferences.theme)
        .bind(&preferences.default_chart_type)
        .bind(&preferences.timezone)
        .execute(&self.pool)
        .await
        .map_err(|e| classify_sqlx_error(e, "Failed to update preferences"))?;
        Ok(())
    }
}

// ============================================================
// SCHEMA MIGRATION
// ============================================================

#[derive(Debug, sqlx::FromRow)]
struct TableColumn {
    name: String,
    notnull: i64,
    pk: i64,
}

/// Tables whose legacy shape cannot be fixed with `ADD COLUMN`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LegacyTable {
    UserFiles,
    UserPreferences,
}

impl LegacyTable {
    fn name(self) -> &'static str {
        match self {
            LegacyTable::UserFiles => "user_files",
            LegacyTable::UserPreferences => "user_preferences",
        }
    }

    fn detached_name(self) -> &'static str {
        match self {
            LegacyTable::UserFiles => "legacy_user_files",
            LegacyTable::UserPreferences => "legacy_user_preferences",
        }
    }

    /// Needs a rebuild when columns block inserts or counts may be NULL
    fn needs_rebuild(self, columns: &[TableColumn]) -> bool {
        if columns.is_empty() {
            return false;
        }
        let find = |name: &str| columns.iter().find(|c| c.name.eq_ignore_ascii_case(name));
        match self {
            LegacyTable::UserFiles => {
                find("file_path").is_some()
                    || ["file_size", "upload_date", "rows_count", "columns_count"]
                        .iter()
                        .any(|name| find(*name).map_or(true, |c| c.notnull == 0))
            }
            LegacyTable::UserPreferences => find("user_id").map_or(true, |c| c.pk == 0),
        }
    }
}

async fn read_user_version(conn: &mut SqliteConnection) -> Result<i64> {
    sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| classify_sqlx_error(e, "Failed to read catalog user_version"))
}

async fn write_user_version(conn: &mut SqliteConnection, version: i64) -> Result<()> {
    let pragma = format!("PRAGMA user_version = {}", version);
    sqlx::query(&pragma)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify_sqlx_error(e, "Failed to set catalog user_version"))?;
    Ok(())
}

async fn table_columns(conn: &mut SqliteConnection, table: &str) -> Result<Vec<TableColumn>> {
    sqlx::query_as::<_, TableColumn>(&format!("PRAGMA table_info({})", table))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| classify_sqlx_error(e, "Failed to inspect catalog schema"))
}

/// Add `column` to `table` unless `PRAGMA table_info` already lists it
async fn ensure_column(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<bool> {
    let exists = table_columns(conn, table)
        .await?
        .iter()
        .any(|c| c.name.eq_ignore_ascii_case(column));
    if exists {
        return Ok(false);
    }

    let alter = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition);
    sqlx::query(&alter)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            classify_sqlx_error(e, &format!("Failed to add column {}.{}", table, column))
        })?;
    info!(table, column, "Added catalog column");
    Ok(true)
}

async fn apply_base_schema(conn: &mut SqliteConnection) -> Result<()> {
    for statement in split_sql_statements(SQLITE_SCHEMA) {
        sqlx::query(statement)
            .execute(&mut *conn)
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to apply catalog schema"))?;
    }

    ensure_column(conn, "user_files", "compressed_data", "TEXT").await?;
    ensure_column(conn, "user_files", "file_type", "TEXT NOT NULL DEFAULT 'csv'").await?;
    Ok(())
}

/// Rename tables with an incompatible legacy shape out of the way
async fn detach_legacy_tables(conn: &mut SqliteConnection) -> Result<Vec<LegacyTable>> {
    let mut detached = Vec::new();
    for table in [LegacyTable::UserFiles, LegacyTable::UserPreferences] {
        let columns = table_columns(conn, table.name()).await?;
        if !table.needs_rebuild(&columns) {
            continue;
        }
        let rename = format!(
            "ALTER TABLE {} RENAME TO {}",
            table.name(),
            table.detached_name()
        );
        sqlx::query(&rename)
            .execute(&mut *conn)
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to detach legacy table"))?;
        info!(table = table.name(), "Rebuilding legacy catalog table");
        detached.push(table);
    }
    Ok(detached)
}

/// Copy rows from a detached legacy table into its rebuilt form, then drop it.
/// Rows whose owner no longer exists are not carried over.
async fn restore_legacy_rows(conn: &mut SqliteConnection, table: LegacyTable) -> Result<()> {
    let source = table.detached_name();
    let columns = table_columns(conn, source).await?;
    let has = |name: &str| columns.iter().any(|c| c.name.eq_ignore_ascii_case(name));
    let or_default = |name: &str, default: &str| {
        if has(name) {
            format!("COALESCE({}, {})", name, default)
        } else {
            default.to_string()
        }
    };

    let copy = match table {
        LegacyTable::UserFiles => format!(
            "INSERT INTO user_files
                (id, user_id, filename, file_size, upload_date, rows_count, columns_count,
                 compressed_data, file_type)
             SELECT id, user_id, filename, {}, {}, {}, {}, {}, {}
             FROM {}
             WHERE user_id IN (SELECT id FROM users)",
            or_default("file_size", "0"),
            or_default("upload_date", "CURRENT_TIMESTAMP"),
            or_default("rows_count", "0"),
            or_default("columns_count", "0"),
            if has("compressed_data") { "compressed_data" } else { "NULL" },
            or_default(
                "file_type",
                "CASE WHEN lower(filename) LIKE '%.xls%' OR lower(filename) LIKE '%.ods' \
                 THEN 'excel' ELSE 'csv' END"
            ),
            source
        ),
        // Latest row per user wins
        LegacyTable::UserPreferences => {
            let defaults = UserPreferences::default();
            format!(
                "INSERT INTO user_preferences (user_id, theme, default_chart_type, timezone)
                 SELECT user_id, {}, {}, {}
                 FROM {}
                 WHERE rowid IN (SELECT MAX(rowid) FROM {} GROUP BY user_id)
                   AND user_id IN (SELECT id FROM users)",
                or_default("theme", &sql_literal(&defaults.theme)),
                or_default("default_chart_type", &sql_literal(&defaults.default_chart_type)),
                or_default("timezone", &sql_literal(&defaults.timezone)),
                source,
                source
            )
        }
    };

    let copied = sqlx::query(&copy)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify_sqlx_error(e, "Failed to copy legacy rows"))?
        .rows_affected();

    sqlx::query(&format!("DROP TABLE {}", source))
        .execute(&mut *conn)
        .await
        .map_err(|e| classify_sqlx_error(e, "Failed to drop legacy table"))?;

    info!(table = table.name(), rows = copied, "Legacy rows restored");
    Ok(())
}

fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
