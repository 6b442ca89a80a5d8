//! Typed client for the Fleetdesk HTTP API.
//!
//! This crate contains:
//! - The [`RentalApi`] trait and its reqwest implementation
//! - An explicit query cache with dependent invalidation
//! - The report builder session (execution and save state machines)
//! - Reservation submission guarded by an availability check

pub mod api;
pub mod cache;
pub mod error;
mod guard;
pub mod report_builder;
pub mod reservations;

#[cfg(test)]
mod testing;

pub use api::{HttpRentalApi, RentalApi};
pub use cache::{QueryCache, QueryKey};
pub use error::ClientError;
pub use report_builder::{ExecutionState, ReportBuilder, ReportSession, SaveState};
pub use reservations::ReservationSubmitter;
