//! Domain error types.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::catalog::{AggregationFunction, FilterOperator};

/// Errors raised by domain rules, before anything reaches the database.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    #[error("Start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Report name is required")]
    MissingReportName,

    #[error("At least one data source is required")]
    NoDataSources,

    #[error("At least one column is required")]
    NoColumns,

    #[error("Unknown data source: {0}")]
    UnknownDataSource(String),

    #[error("Data source listed more than once: {0}")]
    DuplicateDataSource(String),

    #[error("Data source {0} cannot be joined with the other selected sources")]
    UnjoinableDataSource(String),

    #[error("Unknown field: {table}.{field}")]
    UnknownField { table: String, field: String },

    #[error("Data source {0} is referenced but not selected")]
    DataSourceNotSelected(String),

    #[error("Operator {operator} is not allowed for {table}.{field}")]
    OperatorNotAllowed {
        table: String,
        field: String,
        operator: FilterOperator,
    },

    #[error("Invalid value for {table}.{field}: {message}")]
    InvalidFilterValue {
        table: String,
        field: String,
        message: String,
    },

    #[error("Aggregation {aggregation} requires a numeric field, got {table}.{field}")]
    AggregationNotAllowed {
        table: String,
        field: String,
        aggregation: AggregationFunction,
    },

    #[error("Column {table}.{field} must be aggregated or listed in the grouping")]
    UngroupedColumn { table: String, field: String },

    #[error("Result key {0} is produced by columns from different data sources")]
    AmbiguousColumn(String),
}
