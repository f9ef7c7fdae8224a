use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::analysis::AnalysisConfig;
use crate::domain::error::{AppError, Result};

const CONFIG_FILE: &str = "dataloom.toml";
const ENV_PREFIX: &str = "DATALOOM_";

/// Process-wide settings, read once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Connection string; `None` selects the embedded SQLite file
    pub database_url: Option<String>,
    pub sqlite_path: PathBuf,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub max_upload_bytes: u64,
    pub log_filter: String,
    pub analysis: AnalysisConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            sqlite_path: PathBuf::from("dataloom.db"),
            max_connections: 5,
            connect_timeout_secs: 10,
            max_upload_bytes: 50 * 1024 * 1024,
            log_filter: "info".to_string(),
            analysis: AnalysisConfig::default(),
        }
    }
}

/// Which backend a configuration resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    Sqlite { url: String },
    Postgres { url: String },
}

impl AppConfig {
    /// Load `.env`, then defaults <- `dataloom.toml` <- `DATALOOM_*` <- `DATABASE_URL`
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_figment(Self::figment(Path::new(CONFIG_FILE)))
    }

    pub fn figment(config_file: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ValidationError(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(AppError::ValidationError(
                "max_connections must be > 0".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(AppError::ValidationError(
                "max_upload_bytes must be > 0".to_string(),
            ));
        }
        self.analysis
            .validate()
            .map_err(|e| AppError::ValidationError(format!("Invalid analysis config: {}", e)))?;
        self.storage_target().map(|_| ())
    }

    /// Resolve the backend. No URL means the embedded file at `sqlite_path`.
    pub fn storage_target(&self) -> Result<StorageTarget> {
        let Some(url) = self
            .database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
        else {
            return Ok(StorageTarget::Sqlite {
                url: sqlite_url_for_path(&self.sqlite_path)?,
            });
        };

        let lower = url.to_ascii_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Ok(StorageTarget::Postgres {
                url: url.to_string(),
            })
        } else if lower.starts_with("sqlite:") {
            Ok(StorageTarget::Sqlite {
                url: url.to_string(),
            })
        } else {
            Err(AppError::ValidationError(format!(
                "Unsupported database URL scheme: {}",
                url.split(':').next().unwrap_or_default()
            )))
        }
    }
}

pub fn sqlite_url_for_path(path: &Path) -> Result<String> {
    let path_str = path.to_str().ok_or_else(|| {
        AppError::ValidationError("SQLite database path is not valid UTF-8".to_string())
    })?;
    Ok(format!("sqlite://{}", path_str.replace('\\', "/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_url_defaults_to_sqlite_file() {
        let config = AppConfig::default();
        assert_eq!(
            config.storage_target().unwrap(),
            StorageTarget::Sqlite {
                url: "sqlite://dataloom.db".to_string()
            }
        );
    }

    #[test]
    fn test_postgres_url_selects_client_server_backend() {
        let config = AppConfig {
            database_url: Some("postgresql://loom:pw@db:5432/loom".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.storage_target().unwrap(),
            StorageTarget::Postgres { .. }
        ));
    }

    #[test]
    fn test_blank_url_is_treated_as_absent() {
        let config = AppConfig {
            database_url: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.storage_target().unwrap(),
            StorageTarget::Sqlite { .. }
        ));
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let config = AppConfig {
            database_url: Some("mysql://localhost/db".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.storage_target(),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_figment_layers() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "dataloom.toml",
                r#"
                    sqlite_path = "data/loom.db"
                    max_connections = 3

                    [analysis]
                    top_k = 5
                "#,
            )?;
            jail.set_env("DATALOOM_MAX_CONNECTIONS", "8");
            jail.set_env("DATABASE_URL", "postgres://u:p@localhost/loom");

            let config = AppConfig::from_figment(AppConfig::figment(Path::new("dataloom.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.sqlite_path, PathBuf::from("data/loom.db"));
            assert_eq!(config.max_connections, 8);
            assert_eq!(config.analysis.top_k, 5);
            assert_eq!(config.analysis.cardinality_floor, 50);
            assert_eq!(
                config.database_url.as_deref(),
                Some("postgres://u:p@localhost/loom")
            );
            Ok(())
        });
    }
}
