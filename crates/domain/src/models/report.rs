//! Ad-hoc report configuration model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::catalog::{
    AggregationFunction, Catalog, DataSource, FieldType, FilterOperator, JoinStep, ReportField,
};

/// One output column of a report, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportColumn {
    pub field: String,
    pub table: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationFunction>,
}

impl ReportColumn {
    /// Builds a plain column from a catalog field.
    pub fn from_field(field: &ReportField) -> Self {
        Self {
            field: field.name.to_string(),
            table: field.table.to_string(),
            label: field.label.to_string(),
            aggregation: None,
        }
    }

    /// Key under which this column's value appears in result rows.
    pub fn result_key(&self) -> String {
        match self.aggregation {
            Some(agg) => format!("{}_{}", agg.as_str(), self.field),
            None => self.field.clone(),
        }
    }
}

/// A filter operand, typed against the field it is compared with.
///
/// On the wire this is a bare JSON string or number; dates travel as
/// `YYYY-MM-DD` strings. Incoming values are never read as dates here:
/// only [`FilterValue::resolve`] turns a string into a date, and only for
/// date fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "WireValue")]
pub enum FilterValue {
    Number(f64),
    Date(NaiveDate),
    String(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireValue {
    Number(f64),
    String(String),
}

impl From<WireValue> for FilterValue {
    fn from(value: WireValue) -> Self {
        match value {
            WireValue::Number(n) => FilterValue::Number(n),
            WireValue::String(s) => FilterValue::String(s),
        }
    }
}

impl FilterValue {
    /// Parses raw user input for a field of the given type.
    pub fn parse(raw: &str, field_type: FieldType) -> Result<Self, String> {
        match field_type {
            FieldType::String => Ok(FilterValue::String(raw.to_string())),
            FieldType::Number => shared::validation::parse_number(raw)
                .map(FilterValue::Number)
                .map_err(validation_message),
            FieldType::Date => shared::validation::parse_date(raw)
                .map(FilterValue::Date)
                .map_err(validation_message),
        }
    }

    /// Coerces a value received over the wire into the field's type.
    pub fn resolve(self, field_type: FieldType) -> Result<Self, String> {
        match (self, field_type) {
            (v @ FilterValue::String(_), FieldType::String)
            | (v @ FilterValue::Number(_), FieldType::Number)
            | (v @ FilterValue::Date(_), FieldType::Date) => Ok(v),
            (FilterValue::String(s), ty) => Self::parse(&s, ty),
            (FilterValue::Number(n), FieldType::String) => Ok(FilterValue::String(n.to_string())),
            (FilterValue::Date(d), FieldType::String) => Ok(FilterValue::String(
                d.format(shared::validation::DATE_FORMAT).to_string(),
            )),
            (FilterValue::Number(n), FieldType::Date) => Err(format!("{} is not a date", n)),
            (FilterValue::Date(d), FieldType::Number) => Err(format!("{} is not a number", d)),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            FilterValue::String(_) => FieldType::String,
            FilterValue::Number(_) => FieldType::Number,
            FilterValue::Date(_) => FieldType::Date,
        }
    }
}

fn validation_message(err: validator::ValidationError) -> String {
    err.message
        .map(|m| m.to_string())
        .unwrap_or_else(|| err.code.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilter {
    pub table: String,
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl ReportFilter {
    /// Builds a filter from user input, checking the operator and value
    /// against the catalog field.
    pub fn new(
        field: &ReportField,
        operator: FilterOperator,
        raw_value: &str,
    ) -> Result<Self, DomainError> {
        if !field.allows(operator) {
            return Err(DomainError::OperatorNotAllowed {
                table: field.table.to_string(),
                field: field.name.to_string(),
                operator,
            });
        }
        let value = FilterValue::parse(raw_value, field.field_type).map_err(|message| {
            DomainError::InvalidFilterValue {
                table: field.table.to_string(),
                field: field.name.to_string(),
                message,
            }
        })?;
        Ok(Self {
            table: field.table.to_string(),
            field: field.name.to_string(),
            operator,
            value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGrouping {
    pub field: String,
    pub table: String,
}

/// How multiple filters combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Every filter must match (AND).
    #[default]
    All,
    /// At least one filter must match (OR).
    Any,
}

/// The wire payload for report execution and the persisted body of a
/// saved report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfiguration {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub data_sources: Vec<String>,
    #[serde(default)]
    pub columns: Vec<ReportColumn>,
    #[serde(default)]
    pub filters: Vec<ReportFilter>,
    #[serde(default)]
    pub group_by: Vec<ReportGrouping>,
    #[serde(default)]
    pub filter_mode: FilterMode,
}

/// A column resolved against the catalog.
#[derive(Debug, Clone)]
pub struct ResolvedColumn<'a> {
    pub column: &'a ReportColumn,
    pub field: &'a ReportField,
}

/// A filter whose value has been coerced to the field's type.
#[derive(Debug, Clone)]
pub struct ResolvedFilter<'a> {
    pub field: &'a ReportField,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

/// A configuration that passed every catalog check and is ready to be
/// compiled into a query.
#[derive(Debug, Clone)]
pub struct ValidatedReport<'a> {
    pub primary: &'a DataSource,
    pub joins: Vec<JoinStep>,
    pub columns: Vec<ResolvedColumn<'a>>,
    pub filters: Vec<ResolvedFilter<'a>>,
    pub group_by: Vec<&'a ReportField>,
    pub filter_mode: FilterMode,
}

impl ValidatedReport<'_> {
    pub fn is_aggregate(&self) -> bool {
        !self.group_by.is_empty() || self.columns.iter().any(|c| c.column.aggregation.is_some())
    }
}

impl ReportConfiguration {
    /// Checks the parts needed to run a report: sources and columns.
    pub fn validate_for_execution<'a>(
        &'a self,
        catalog: &'a Catalog,
    ) -> Result<ValidatedReport<'a>, DomainError> {
        if self.data_sources.is_empty() {
            return Err(DomainError::NoDataSources);
        }
        if self.columns.is_empty() {
            return Err(DomainError::NoColumns);
        }

        let joins = catalog.join_plan(&self.data_sources)?;
        let primary = catalog
            .data_source(&self.data_sources[0])
            .ok_or_else(|| DomainError::UnknownDataSource(self.data_sources[0].clone()))?;

        let lookup = |table: &str, field: &str| -> Result<&'a ReportField, DomainError> {
            if !self.data_sources.iter().any(|s| s == table) {
                return Err(DomainError::DataSourceNotSelected(table.to_string()));
            }
            catalog.require_field(table, field)
        };

        let mut columns = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let field = lookup(&column.table, &column.field)?;
            if let Some(agg) = column.aggregation {
                if agg.requires_number() && field.field_type != FieldType::Number {
                    return Err(DomainError::AggregationNotAllowed {
                        table: column.table.clone(),
                        field: column.field.clone(),
                        aggregation: agg,
                    });
                }
            }
            columns.push(ResolvedColumn { column, field });
        }

        // Two columns may share a result key only when they are the same column.
        for (i, a) in columns.iter().enumerate() {
            for b in &columns[i + 1..] {
                if a.column.result_key() == b.column.result_key() && a.field.table != b.field.table
                {
                    return Err(DomainError::AmbiguousColumn(a.column.result_key()));
                }
            }
        }

        let mut filters = Vec::with_capacity(self.filters.len());
        for filter in &self.filters {
            let field = lookup(&filter.table, &filter.field)?;
            if !field.allows(filter.operator) {
                return Err(DomainError::OperatorNotAllowed {
                    table: filter.table.clone(),
                    field: filter.field.clone(),
                    operator: filter.operator,
                });
            }
            let value = filter.value.clone().resolve(field.field_type).map_err(|message| {
                DomainError::InvalidFilterValue {
                    table: filter.table.clone(),
                    field: filter.field.clone(),
                    message,
                }
            })?;
            filters.push(ResolvedFilter {
                field,
                operator: filter.operator,
                value,
            });
        }

        let mut group_by = Vec::with_capacity(self.group_by.len());
        for grouping in &self.group_by {
            group_by.push(lookup(&grouping.table, &grouping.field)?);
        }

        let report = ValidatedReport {
            primary,
            joins,
            columns,
            filters,
            group_by,
            filter_mode: self.filter_mode,
        };

        if report.is_aggregate() {
            for c in report.columns.iter().filter(|c| c.column.aggregation.is_none()) {
                let grouped = report
                    .group_by
                    .iter()
                    .any(|g| g.table == c.field.table && g.name == c.field.name);
                if !grouped {
                    return Err(DomainError::UngroupedColumn {
                        table: c.column.table.clone(),
                        field: c.column.field.clone(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Checks everything [`validate_for_execution`](Self::validate_for_execution)
    /// does, plus the presence of a name.
    pub fn validate_for_save<'a>(
        &'a self,
        catalog: &'a Catalog,
    ) -> Result<ValidatedReport<'a>, DomainError> {
        if shared::validation::validate_not_blank(&self.name).is_err() {
            return Err(DomainError::MissingReportName);
        }
        self.validate_for_execution(catalog)
    }
}

/// A persisted, named report configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedReport {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub configuration: ReportConfiguration,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// One result row, keyed by [`ReportColumn::result_key`].
pub type ReportRow = serde_json::Map<String, serde_json::Value>;
