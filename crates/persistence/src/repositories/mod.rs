//! Repository implementations for database operations.

pub mod report;
pub mod reservation;
pub mod saved_report;

pub use report::{build_report_query, ReportRepository};
pub use reservation::{BookingOutcome, NewReservation, ReservationRepository};
pub use saved_report::SavedReportRepository;
