//! Report builder and the session that runs and saves it.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use domain::models::catalog::{catalog, AggregationFunction, FilterOperator};
use domain::models::report::{
    FilterMode, ReportColumn, ReportConfiguration, ReportFilter, ReportGrouping, SavedReport,
};
use domain::models::report_table::ReportTable;
use domain::DomainError;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{RemoteCatalog, RentalApi};
use crate::cache::{QueryCache, QueryKey};
use crate::error::ClientError;
use crate::guard::InFlight;

// ============================================================================
// Builder
// ============================================================================

/// Edits a [`ReportConfiguration`] against the local catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportBuilder {
    configuration: ReportConfiguration,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configuration(configuration: ReportConfiguration) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &ReportConfiguration {
        &self.configuration
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.configuration.name = name.into();
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.configuration.description = description;
    }

    pub fn set_filter_mode(&mut self, mode: FilterMode) {
        self.configuration.filter_mode = mode;
    }

    /// Selects a data source. The first one selected is the primary source.
    pub fn add_data_source(&mut self, name: &str) -> Result<(), ClientError> {
        if catalog().data_source(name).is_none() {
            return Err(DomainError::UnknownDataSource(name.to_string()).into());
        }
        if self.configuration.data_sources.iter().any(|s| s == name) {
            return Err(DomainError::DuplicateDataSource(name.to_string()).into());
        }
        self.configuration.data_sources.push(name.to_string());
        Ok(())
    }

    /// Deselects a data source along with every column, filter and grouping
    /// that refers to it.
    pub fn remove_data_source(&mut self, name: &str) {
        let cfg = &mut self.configuration;
        cfg.data_sources.retain(|s| s != name);
        cfg.columns.retain(|c| c.table != name);
        cfg.filters.retain(|f| f.table != name);
        cfg.group_by.retain(|g| g.table != name);
    }

    /// Appends a column. Repeating a column is allowed.
    pub fn add_column(
        &mut self,
        table: &str,
        field: &str,
        aggregation: Option<AggregationFunction>,
    ) -> Result<(), ClientError> {
        self.require_selected(table)?;
        let field = catalog().require_field(table, field)?;
        self.configuration.columns.push(ReportColumn {
            aggregation,
            ..ReportColumn::from_field(field)
        });
        Ok(())
    }

    pub fn remove_column(&mut self, index: usize) -> Option<ReportColumn> {
        (index < self.configuration.columns.len())
            .then(|| self.configuration.columns.remove(index))
    }

    /// Appends a filter after checking the operator and parsing `raw_value`
    /// for the field's type.
    pub fn add_filter(
        &mut self,
        table: &str,
        field: &str,
        operator: FilterOperator,
        raw_value: &str,
    ) -> Result<(), ClientError> {
        self.require_selected(table)?;
        let field = catalog().require_field(table, field)?;
        let filter = ReportFilter::new(field, operator, raw_value)?;
        self.configuration.filters.push(filter);
        Ok(())
    }

    pub fn remove_filter(&mut self, index: usize) -> Option<ReportFilter> {
        (index < self.configuration.filters.len())
            .then(|| self.configuration.filters.remove(index))
    }

    pub fn add_grouping(&mut self, table: &str, field: &str) -> Result<(), ClientError> {
        self.require_selected(table)?;
        let field = catalog().require_field(table, field)?;
        let grouping = ReportGrouping {
            field: field.name.to_string(),
            table: field.table.to_string(),
        };
        if !self.configuration.group_by.contains(&grouping) {
            self.configuration.group_by.push(grouping);
        }
        Ok(())
    }

    /// Replaces the whole configuration with a saved one.
    pub fn load_saved(&mut self, report: &SavedReport) {
        self.configuration = ReportConfiguration {
            name: report.name.clone(),
            description: report.description.clone(),
            ..report.configuration.clone()
        };
    }

    pub fn clear(&mut self) {
        self.configuration = ReportConfiguration::default();
    }

    fn require_selected(&self, table: &str) -> Result<(), ClientError> {
        if self.configuration.data_sources.iter().any(|s| s == table) {
            Ok(())
        } else {
            Err(DomainError::DataSourceNotSelected(table.to_string()).into())
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Progress of report execution.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExecutionState {
    #[default]
    Idle,
    Configuring,
    Executing,
    ResultsShown(ReportTable),
    ExecutionFailed(String),
}

/// Progress of saving the current configuration. Independent of
/// [`ExecutionState`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SaveState {
    #[default]
    Idle,
    Saving,
    Saved(SavedReport),
    SaveFailed(String),
}

/// One user's report builder, wired to the API and the shared cache.
pub struct ReportSession<A: RentalApi> {
    api: Arc<A>,
    cache: Arc<QueryCache>,
    builder: Mutex<ReportBuilder>,
    execution: Mutex<ExecutionState>,
    save: Mutex<SaveState>,
    running: AtomicBool,
    saving: AtomicBool,
    deleting: AtomicBool,
}

impl<A: RentalApi> ReportSession<A> {
    pub fn new(api: Arc<A>, cache: Arc<QueryCache>) -> Self {
        Self {
            api,
            cache,
            builder: Mutex::new(ReportBuilder::new()),
            execution: Mutex::new(ExecutionState::Idle),
            save: Mutex::new(SaveState::Idle),
            running: AtomicBool::new(false),
            saving: AtomicBool::new(false),
            deleting: AtomicBool::new(false),
        }
    }

    /// Applies an edit to the builder.
    pub async fn edit<R>(&self, f: impl FnOnce(&mut ReportBuilder) -> R) -> R {
        let result = f(&mut *self.builder.lock().await);
        self.mark_configuring().await;
        result
    }

    pub async fn configuration(&self) -> ReportConfiguration {
        self.builder.lock().await.configuration().clone()
    }

    pub async fn execution_state(&self) -> ExecutionState {
        self.execution.lock().await.clone()
    }

    pub async fn save_state(&self) -> SaveState {
        self.save.lock().await.clone()
    }

    /// Loads a saved report into the builder, replacing everything in it.
    pub async fn load_saved(&self, report: &SavedReport) {
        self.builder.lock().await.load_saved(report);
        self.mark_configuring().await;
        *self.save.lock().await = SaveState::Idle;
    }

    /// Validates locally, then executes the current configuration.
    pub async fn run(&self) -> Result<ReportTable, ClientError> {
        let _in_flight = InFlight::acquire(&self.running)?;
        let configuration = self.configuration().await;
        configuration.validate_for_execution(catalog())?;

        *self.execution.lock().await = ExecutionState::Executing;
        match self.api.execute_report(&configuration).await {
            Ok(rows) => {
                let table = ReportTable::render(&configuration.columns, &rows);
                info!(rows = table.row_count(), "Report executed");
                *self.execution.lock().await = ExecutionState::ResultsShown(table.clone());
                Ok(table)
            }
            Err(err) => {
                warn!(error = %err, "Report execution failed");
                *self.execution.lock().await = ExecutionState::ExecutionFailed(err.to_string());
                Err(err)
            }
        }
    }

    /// Validates locally (including the name), then saves the current
    /// configuration.
    pub async fn save(&self) -> Result<SavedReport, ClientError> {
        let _in_flight = InFlight::acquire(&self.saving)?;
        let configuration = self.configuration().await;
        configuration.validate_for_save(catalog())?;

        *self.save.lock().await = SaveState::Saving;
        match self.api.save_report(&configuration).await {
            Ok(saved) => {
                self.cache.invalidate(&QueryKey::SavedReports).await;
                info!(report_id = %saved.id, "Report saved");
                *self.save.lock().await = SaveState::Saved(saved.clone());
                Ok(saved)
            }
            Err(err) => {
                warn!(error = %err, "Saving report failed");
                *self.save.lock().await = SaveState::SaveFailed(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn delete_saved(&self, id: Uuid) -> Result<(), ClientError> {
        let _in_flight = InFlight::acquire(&self.deleting)?;
        self.api.delete_saved_report(id).await?;
        self.cache.invalidate(&QueryKey::SavedReports).await;
        info!(report_id = %id, "Saved report deleted");
        Ok(())
    }

    pub async fn saved_reports(&self) -> Result<Arc<Vec<SavedReport>>, ClientError> {
        self.cache
            .get_or_fetch(QueryKey::SavedReports, || self.api.list_saved_reports())
            .await
    }

    pub async fn catalog(&self) -> Result<Arc<RemoteCatalog>, ClientError> {
        self.cache
            .get_or_fetch(QueryKey::ReportCatalog, || self.api.fetch_catalog())
            .await
    }

    async fn mark_configuring(&self) {
        let mut execution = self.execution.lock().await;
        if *execution != ExecutionState::Executing {
            *execution = ExecutionState::Configuring;
        }
    }
}
