//! Shared utilities and common types for the Fleetdesk backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Calendar date parsing in the wire format
//! - Common validation logic

pub mod validation;
