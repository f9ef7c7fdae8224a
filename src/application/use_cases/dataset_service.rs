use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::insights::{correlation_matrix, InsightGenerator};
use super::outliers::OutlierDetector;
use super::profiler::Profiler;
use super::report::ReportRenderer;
use super::schema_inference::SchemaInferer;
use crate::domain::analysis::{
    AnalysisConfig, ColumnClassification, CorrelationMatrix, Insight, OutlierReport, SummaryStats,
};
use crate::domain::catalog::{SessionContext, StoredFile, UserPreferences};
use crate::domain::error::{AppError, Result};
use crate::domain::table::Table;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::FileStore;
use crate::infrastructure::ingest;

/// Everything the dashboard shows for one table
#[derive(Debug, Clone, Serialize)]
pub struct DatasetAnalysis {
    pub classification: ColumnClassification,
    pub summary: SummaryStats,
    pub insights: Vec<Insight>,
    pub outliers: OutlierReport,
    pub correlations: CorrelationMatrix,
}

/// Session-scoped facade over ingestion, storage and analysis.
///
/// Every call names its caller through a [`SessionContext`]; file access
/// is always filtered by that owner.
pub struct DatasetService {
    store: Arc<dyn FileStore>,
    analysis: AnalysisConfig,
    max_upload_bytes: u64,
}

impl DatasetService {
    pub fn new(store: Arc<dyn FileStore>, analysis: AnalysisConfig, max_upload_bytes: u64) -> Self {
        Self {
            store,
            analysis,
            max_upload_bytes,
        }
    }

    pub fn from_config(store: Arc<dyn FileStore>, config: &AppConfig) -> Self {
        Self::new(store, config.analysis.clone(), config.max_upload_bytes)
    }

    /// Parse an upload and store it for the caller, returning the new file id
    pub async fn upload(&self, ctx: &SessionContext, filename: &str, bytes: &[u8]) -> Result<i64> {
        let (table, file_type) = ingest::load_table(filename, bytes, self.max_upload_bytes)
            .map_err(|e| {
                warn!(user_id = ctx.user_id, filename, error = %e, "Upload rejected");
                e
            })?;
        let file_id = self
            .store
            .save_file(ctx.user_id, filename, &table, file_type)
            .await?;
        info!(user_id = ctx.user_id, file_id, "Upload stored");
        Ok(file_id)
    }

    pub async fn list(&self, ctx: &SessionContext) -> Result<Vec<StoredFile>> {
        self.store.list_files(ctx.user_id).await
    }

    /// Load one of the caller's tables. Another owner's id is `NotFound`.
    pub async fn open(&self, ctx: &SessionContext, file_id: i64) -> Result<Table> {
        self.store
            .load_owned_file(file_id, ctx.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))
    }

    pub async fn analyze(&self, ctx: &SessionContext, file_id: i64) -> Result<DatasetAnalysis> {
        let table = self.open(ctx, file_id).await?;
        Ok(self.analyze_table(&table))
    }

    /// One classification pass shared by every analysis step
    pub fn analyze_table(&self, table: &Table) -> DatasetAnalysis {
        let classification =
            SchemaInferer::new(self.analysis.datetime_sample_size).classify(table);
        let summary = Profiler::new(self.analysis.clone()).summarize_with(table, &classification);
        let insights = InsightGenerator::new(self.analysis.clone()).generate_insights(
            table,
            &classification.numeric,
            &classification.categorical,
        );
        let outliers = OutlierDetector::new(self.analysis.iqr_multiplier)
            .detect_outliers(table, &classification.numeric);
        let correlations = correlation_matrix(table, &classification.numeric);

        DatasetAnalysis {
            classification,
            summary,
            insights,
            outliers,
            correlations,
        }
    }

    pub async fn report(&self, ctx: &SessionContext, file_id: i64) -> Result<String> {
        let table = self.open(ctx, file_id).await?;
        Ok(ReportRenderer::new(self.analysis.clone()).render_report(&table))
    }

    pub async fn export_csv(&self, ctx: &SessionContext, file_id: i64) -> Result<String> {
        let table = self.open(ctx, file_id).await?;
        ingest::write_csv(&table)
    }

    /// `false` when the file is absent or owned by someone else
    pub async fn delete(&self, ctx: &SessionContext, file_id: i64) -> Result<bool> {
        self.store.delete_file(file_id, ctx.user_id).await
    }

    pub async fn preferences(&self, ctx: &SessionContext) -> Result<UserPreferences> {
        self.store.get_preferences(ctx.user_id).await
    }

    pub async fn update_preferences(
        &self,
        ctx: &SessionContext,
        preferences: &UserPreferences,
    ) -> Result<()> {
        self.store.update_preferences(ctx.user_id, preferences).await
    }
}
