//! Static catalog of reportable data sources and fields.
//!
//! The catalog is the only source of SQL identifiers for ad-hoc reports:
//! user-supplied table and field names are looked up here and never
//! interpolated directly.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Declared type of a report field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Date,
}

impl FieldType {
    /// SQL type a field is cast to when compared against a bound filter value.
    pub fn sql_cast(&self) -> &'static str {
        match self {
            FieldType::String => "text",
            FieldType::Number => "float8",
            FieldType::Date => "date",
        }
    }
}

/// Comparison applied by a report filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "notEquals",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "startsWith",
            FilterOperator::GreaterThan => "greaterThan",
            FilterOperator::LessThan => "lessThan",
            FilterOperator::GreaterThanOrEqual => "greaterThanOrEqual",
            FilterOperator::LessThanOrEqual => "lessThanOrEqual",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summarizing operation applied to a report column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregationFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationFunction::Count => "count",
            AggregationFunction::Sum => "sum",
            AggregationFunction::Avg => "avg",
            AggregationFunction::Min => "min",
            AggregationFunction::Max => "max",
        }
    }

    /// SQL aggregate function name.
    pub fn sql_function(&self) -> &'static str {
        match self {
            AggregationFunction::Count => "COUNT",
            AggregationFunction::Sum => "SUM",
            AggregationFunction::Avg => "AVG",
            AggregationFunction::Min => "MIN",
            AggregationFunction::Max => "MAX",
        }
    }

    /// Whether the aggregation only makes sense on numeric fields.
    pub fn requires_number(&self) -> bool {
        matches!(self, AggregationFunction::Sum | AggregationFunction::Avg)
    }
}

impl fmt::Display for AggregationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selectable field of a data source.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportField {
    pub table: &'static str,
    pub name: &'static str,
    pub label: &'static str,
    #[serde(skip)]
    pub column: &'static str,
    pub field_type: FieldType,
    pub operators: &'static [FilterOperator],
}

impl ReportField {
    pub fn allows(&self, operator: FilterOperator) -> bool {
        self.operators.contains(&operator)
    }
}

/// A named logical table exposed to the report builder.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub name: &'static str,
    pub label: &'static str,
    pub fields: Vec<ReportField>,
}

impl DataSource {
    pub fn field(&self, name: &str) -> Option<&ReportField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A foreign-key relation between two data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub from_table: &'static str,
    pub from_column: &'static str,
    pub to_table: &'static str,
    pub to_column: &'static str,
}

impl Relation {
    fn touches(&self, table: &str) -> bool {
        self.from_table == table || self.to_table == table
    }

    fn other(&self, table: &str) -> &'static str {
        if self.from_table == table {
            self.to_table
        } else {
            self.from_table
        }
    }
}

/// One `LEFT JOIN` in a report query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinStep {
    pub table: &'static str,
    pub relation: Relation,
}

/// The full set of reportable sources and relations.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub data_sources: Vec<DataSource>,
    pub relations: Vec<Relation>,
}

impl Catalog {
    pub fn data_source(&self, name: &str) -> Option<&DataSource> {
        self.data_sources.iter().find(|ds| ds.name == name)
    }

    pub fn field(&self, table: &str, name: &str) -> Option<&ReportField> {
        self.data_source(table).and_then(|ds| ds.field(name))
    }

    /// Like [`Catalog::field`] but reports unknown references as errors.
    pub fn require_field(&self, table: &str, name: &str) -> Result<&ReportField, DomainError> {
        self.field(table, name).ok_or_else(|| DomainError::UnknownField {
            table: table.to_string(),
            field: name.to_string(),
        })
    }

    /// Orders the joins needed to reach every source from the first one.
    ///
    /// Each later source must be directly related to a source that is
    /// already part of the query.
    pub fn join_plan(&self, sources: &[String]) -> Result<Vec<JoinStep>, DomainError> {
        let (primary, rest) = sources.split_first().ok_or(DomainError::NoDataSources)?;
        let primary = self
            .data_source(primary)
            .ok_or_else(|| DomainError::UnknownDataSource(primary.clone()))?;

        let mut joined: Vec<&'static str> = vec![primary.name];
        let mut pending: Vec<&'static str> = Vec::with_capacity(rest.len());
        for name in rest {
            let ds = self
                .data_source(name)
                .ok_or_else(|| DomainError::UnknownDataSource(name.clone()))?;
            if joined.contains(&ds.name) || pending.contains(&ds.name) {
                return Err(DomainError::DuplicateDataSource(name.clone()));
            }
            pending.push(ds.name);
        }

        let mut steps = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let next = pending.iter().enumerate().find_map(|(idx, table)| {
                self.relations
                    .iter()
                    .find(|r| r.touches(table) && joined.contains(&r.other(table)))
                    .map(|r| (idx, *table, *r))
            });
            match next {
                Some((idx, table, relation)) => {
                    pending.remove(idx);
                    joined.push(table);
                    steps.push(JoinStep { table, relation });
                }
                None => return Err(DomainError::UnjoinableDataSource(pending[0].to_string())),
            }
        }
        Ok(steps)
    }
}

const STRING_OPS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::Contains,
    FilterOperator::StartsWith,
];

const ID_OPS: &[FilterOperator] = &[FilterOperator::Equals, FilterOperator::NotEquals];

const ORDERED_OPS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::GreaterThan,
    FilterOperator::LessThan,
    FilterOperator::GreaterThanOrEqual,
    FilterOperator::LessThanOrEqual,
];

fn string(
    table: &'static str,
    name: &'static str,
    label: &'static str,
    column: &'static str,
) -> ReportField {
    ReportField {
        table,
        name,
        label,
        column,
        field_type: FieldType::String,
        operators: STRING_OPS,
    }
}

fn id(
    table: &'static str,
    name: &'static str,
    label: &'static str,
    column: &'static str,
) -> ReportField {
    ReportField {
        table,
        name,
        label,
        column,
        field_type: FieldType::String,
        operators: ID_OPS,
    }
}

fn number(
    table: &'static str,
    name: &'static str,
    label: &'static str,
    column: &'static str,
) -> ReportField {
    ReportField {
        table,
        name,
        label,
        column,
        field_type: FieldType::Number,
        operators: ORDERED_OPS,
    }
}

fn date(
    table: &'static str,
    name: &'static str,
    label: &'static str,
    column: &'static str,
) -> ReportField {
    ReportField {
        table,
        name,
        label,
        column,
        field_type: FieldType::Date,
        operators: ORDERED_OPS,
    }
}

fn build_catalog() -> Catalog {
    let data_sources = vec![
        DataSource {
            name: "vehicles",
            label: "Vehicles",
            fields: vec![
                id("vehicles", "id", "Vehicle ID", "id"),
                string("vehicles", "make", "Make", "make"),
                string("vehicles", "model", "Model", "model"),
                number("vehicles", "year", "Year", "year"),
                string("vehicles", "licensePlate", "License plate", "license_plate"),
                string("vehicles", "status", "Status", "status"),
                number("vehicles", "dailyRate", "Daily rate", "daily_rate"),
                number("vehicles", "mileage", "Mileage", "mileage"),
                date("vehicles", "createdAt", "Added on", "created_at"),
            ],
        },
        DataSource {
            name: "customers",
            label: "Customers",
            fields: vec![
                id("customers", "id", "Customer ID", "id"),
                string("customers", "firstName", "First name", "first_name"),
                string("customers", "lastName", "Last name", "last_name"),
                string("customers", "email", "Email", "email"),
                string("customers", "phone", "Phone", "phone"),
                string("customers", "city", "City", "city"),
                date("customers", "createdAt", "Customer since", "created_at"),
            ],
        },
        DataSource {
            name: "drivers",
            label: "Drivers",
            fields: vec![
                id("drivers", "id", "Driver ID", "id"),
                string("drivers", "firstName", "First name", "first_name"),
                string("drivers", "lastName", "Last name", "last_name"),
                string("drivers", "licenseNumber", "License number", "license_number"),
                date("drivers", "licenseExpiry", "License expiry", "license_expiry"),
                string("drivers", "status", "Status", "status"),
            ],
        },
        DataSource {
            name: "reservations",
            label: "Reservations",
            fields: vec![
                id("reservations", "id", "Reservation ID", "id"),
                id("reservations", "vehicleId", "Vehicle ID", "vehicle_id"),
                id("reservations", "customerId", "Customer ID", "customer_id"),
                id("reservations", "driverId", "Driver ID", "driver_id"),
                date("reservations", "startDate", "Start date", "start_date"),
                date("reservations", "endDate", "End date", "end_date"),
                string("reservations", "status", "Status", "status"),
                number("reservations", "totalAmount", "Total amount", "total_amount"),
                date("reservations", "createdAt", "Booked on", "created_at"),
            ],
        },
        DataSource {
            name: "expenses",
            label: "Expenses",
            fields: vec![
                id("expenses", "id", "Expense ID", "id"),
                id("expenses", "vehicleId", "Vehicle ID", "vehicle_id"),
                string("expenses", "category", "Category", "category"),
                number("expenses", "amount", "Amount", "amount"),
                date("expenses", "expenseDate", "Date", "expense_date"),
                string("expenses", "description", "Description", "description"),
            ],
        },
        DataSource {
            name: "maintenance",
            label: "Maintenance",
            fields: vec![
                id("maintenance", "id", "Maintenance ID", "id"),
                id("maintenance", "vehicleId", "Vehicle ID", "vehicle_id"),
                string("maintenance", "serviceType", "Service type", "service_type"),
                date("maintenance", "scheduledDate", "Scheduled date", "scheduled_date"),
                date("maintenance", "completedDate", "Completed date", "completed_date"),
                number("maintenance", "cost", "Cost", "cost"),
                string("maintenance", "status", "Status", "status"),
            ],
        },
    ];

    let relations = vec![
        Relation {
            from_table: "reservations",
            from_column: "vehicle_id",
            to_table: "vehicles",
            to_column: "id",
        },
        Relation {
            from_table: "reservations",
            from_column: "customer_id",
            to_table: "customers",
            to_column: "id",
        },
        Relation {
            from_table: "reservations",
            from_column: "driver_id",
            to_table: "drivers",
            to_column: "id",
        },
        Relation {
            from_table: "expenses",
            from_column: "vehicle_id",
            to_table: "vehicles",
            to_column: "id",
        },
        Relation {
            from_table: "maintenance",
            from_column: "vehicle_id",
            to_table: "vehicles",
            to_column: "id",
        },
    ];

    Catalog {
        data_sources,
        relations,
    }
}

lazy_static! {
    static ref CATALOG: Catalog = build_catalog();
}

/// Returns the process-wide report catalog.
pub fn catalog() -> &'static Catalog {
    &CATALOG
}
