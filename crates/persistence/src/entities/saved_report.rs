//! Saved report entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::report::{ReportConfiguration, SavedReport};

/// Database row mapping for the saved_reports table.
#[derive(Debug, Clone, FromRow)]
pub struct SavedReportEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub configuration: serde_json::Value,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SavedReportEntity> for SavedReport {
    type Error = serde_json::Error;

    fn try_from(entity: SavedReportEntity) -> Result<Self, Self::Error> {
        let configuration: ReportConfiguration = serde_json::from_value(entity.configuration)?;
        Ok(Self {
            id: entity.id,
            name: entity.name,
            description: entity.description,
            configuration,
            created_by: entity.created_by,
            created_at: entity.created_at,
        })
    }
}
