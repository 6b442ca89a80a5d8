//! Ad-hoc report endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use persistence::entities::SavedReportEntity;
use persistence::repositories::{ReportRepository, SavedReportRepository};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ActingUser;
use domain::models::catalog::{catalog, Catalog};
use domain::models::report::{ReportConfiguration, ReportRow, SavedReport};

/// The reportable data sources and their fields.
///
/// GET /api/reports/catalog
pub async fn get_catalog() -> Json<&'static Catalog> {
    Json(catalog())
}

/// Run a report configuration and return its rows.
///
/// POST /api/reports/execute
pub async fn execute_report(
    State(state): State<AppState>,
    Json(configuration): Json<ReportConfiguration>,
) -> Result<Json<Vec<ReportRow>>, ApiError> {
    let report = configuration.validate_for_execution(catalog())?;

    let repo = ReportRepository::new(state.pool.clone());
    let rows = repo
        .execute(&report, i64::from(state.config.reports.max_rows))
        .await?;

    info!(
        primary = report.primary.name,
        joins = report.joins.len(),
        columns = report.columns.len(),
        filters = report.filters.len(),
        rows = rows.len(),
        "Report executed"
    );

    Ok(Json(rows))
}

/// List saved reports, newest first.
///
/// GET /api/reports/saved
pub async fn list_saved_reports(
    State(state): State<AppState>,
) -> Result<Json<Vec<SavedReport>>, ApiError> {
    let repo = SavedReportRepository::new(state.pool.clone());
    let reports = repo
        .list()
        .await?
        .into_iter()
        .filter_map(decode_saved_report)
        .collect();
    Ok(Json(reports))
}

/// Get a saved report.
///
/// GET /api/reports/saved/:report_id
pub async fn get_saved_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<SavedReport>, ApiError> {
    let repo = SavedReportRepository::new(state.pool.clone());
    let entity = repo
        .find_by_id(report_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Saved report not found".to_string()))?;
    let report = SavedReport::try_from(entity)
        .map_err(|e| ApiError::Internal(format!("Stored report is unreadable: {}", e)))?;
    Ok(Json(report))
}

/// Save a report configuration under its name.
///
/// POST /api/reports/saved
pub async fn save_report(
    State(state): State<AppState>,
    user: ActingUser,
    Json(configuration): Json<ReportConfiguration>,
) -> Result<(StatusCode, Json<SavedReport>), ApiError> {
    configuration.validate_for_save(catalog())?;

    let repo = SavedReportRepository::new(state.pool.clone());
    let entity = repo.create(&configuration, &user.0).await?;
    let report = SavedReport::try_from(entity)
        .map_err(|e| ApiError::Internal(format!("Stored report is unreadable: {}", e)))?;

    info!(
        report_id = %report.id,
        name = %report.name,
        created_by = %report.created_by,
        "Report saved"
    );

    Ok((StatusCode::CREATED, Json(report)))
}

/// Delete a saved report.
///
/// DELETE /api/reports/saved/:report_id
pub async fn delete_saved_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = SavedReportRepository::new(state.pool.clone());
    if !repo.delete(report_id).await? {
        return Err(ApiError::NotFound("Saved report not found".to_string()));
    }

    info!(report_id = %report_id, "Saved report deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Rows whose configuration no longer decodes are left out of listings.
fn decode_saved_report(entity: SavedReportEntity) -> Option<SavedReport> {
    let id = entity.id;
    match SavedReport::try_from(entity) {
        Ok(report) => Some(report),
        Err(e) => {
            warn!(report_id = %id, error = %e, "Skipping unreadable saved report");
            None
        }
    }
}
