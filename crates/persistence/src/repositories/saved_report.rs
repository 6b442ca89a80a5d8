//! Saved report repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use domain::models::report::ReportConfiguration;

use crate::entities::SavedReportEntity;
use crate::metrics::QueryTimer;

const SAVED_REPORT_COLUMNS: &str = "id, name, description, configuration, created_by, created_at";

/// Repository for saved report definitions.
#[derive(Clone)]
pub struct SavedReportRepository {
    pool: PgPool,
}

impl SavedReportRepository {
    /// Creates a new SavedReportRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List saved reports, newest first.
    pub async fn list(&self) -> Result<Vec<SavedReportEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_saved_reports");
        let sql = format!(
            "SELECT {} FROM saved_reports ORDER BY created_at DESC",
            SAVED_REPORT_COLUMNS
        );
        let result = sqlx::query_as::<_, SavedReportEntity>(&sql)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Find a saved report by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<SavedReportEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_saved_report_by_id");
        let sql = format!("SELECT {} FROM saved_reports WHERE id = $1", SAVED_REPORT_COLUMNS);
        let result = sqlx::query_as::<_, SavedReportEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Persist a configuration under its own name and description.
    pub async fn create(
        &self,
        configuration: &ReportConfiguration,
        created_by: &str,
    ) -> Result<SavedReportEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_saved_report");
        let body = serde_json::to_value(configuration)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let sql = format!(
            r#"
            INSERT INTO saved_reports (name, description, configuration, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            SAVED_REPORT_COLUMNS
        );
        let result = sqlx::query_as::<_, SavedReportEntity>(&sql)
            .bind(configuration.name.trim())
            .bind(configuration.description.as_deref())
            .bind(body)
            .bind(created_by)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Delete a saved report. Returns false if no row matched.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_saved_report");
        let result = sqlx::query("DELETE FROM saved_reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }
}
