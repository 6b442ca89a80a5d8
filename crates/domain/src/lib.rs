//! Domain layer for the Fleetdesk backend.
//!
//! This crate contains:
//! - Domain models (Reservation, DateRange, report configuration and catalog)
//! - Business logic services (booking conflict detection)
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::DomainError;
