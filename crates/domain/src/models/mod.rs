//! Domain models for Fleetdesk.

pub mod catalog;
pub mod date_range;
pub mod report;
pub mod report_table;
pub mod reservation;

pub use catalog::{catalog, AggregationFunction, Catalog, FieldType, FilterOperator, ReportField};
pub use date_range::{BoundaryPolicy, DateRange};
pub use report::{
    FilterMode, FilterValue, ReportColumn, ReportConfiguration, ReportFilter, ReportGrouping,
    ReportRow, SavedReport,
};
pub use report_table::ReportTable;
pub use reservation::{Reservation, ReservationStatus};
