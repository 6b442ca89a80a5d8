//! Persistence layer for the Fleetdesk backend.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations, including the report query compiler

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
