//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod reservation;
pub mod saved_report;

pub use reservation::{ReservationEntity, RESERVATION_COLUMNS};
pub use saved_report::SavedReportEntity;
