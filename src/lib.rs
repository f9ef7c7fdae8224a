//! DataLoom: profiling and insight engine for uploaded tables, backed by a
//! compressed catalog that runs on either SQLite or PostgreSQL.
//!
//! Typical wiring:
//!
//! ```no_run
//! use dataloom::{connect_store, init_tracing, AppConfig, DatasetService, SessionContext};
//!
//! # async fn demo() -> dataloom::Result<()> {
//! let config = AppConfig::load()?;
//! init_tracing(&config.log_filter);
//! let store = connect_store(&config).await?;
//! let user = store.create_user("ada", "ada@example.com", "analytical-engine").await?;
//!
//! let service = DatasetService::from_config(store, &config);
//! let ctx = SessionContext::new(user.id);
//! let file_id = service.upload(&ctx, "sales.csv", b"region,units\nnorth,3\n").await?;
//! println!("{}", service.report(&ctx, file_id).await?);
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use crate::application::use_cases::dataset_service::{DatasetAnalysis, DatasetService};
pub use crate::application::{
    InsightGenerator, OutlierDetector, Profiler, ReportRenderer, SchemaInferer,
};
pub use crate::domain::analysis::{
    AnalysisConfig, ColumnClassification, CorrelationMatrix, Insight, InsightCategory,
    OutlierReport, OutlierStats, SummaryStats,
};
pub use crate::domain::catalog::{FileType, SessionContext, StoredFile, User, UserPreferences};
pub use crate::domain::error::{AppError, Result};
pub use crate::domain::table::{Cell, Column, ColumnKind, Table};
pub use crate::infrastructure::codec::{decode, encode};
pub use crate::infrastructure::config::{AppConfig, StorageTarget};
pub use crate::infrastructure::db::{connect_store, FileStore, PostgresStore, SqliteStore, StorageBackend};
pub use crate::infrastructure::logging::init_tracing;
