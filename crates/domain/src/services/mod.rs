//! Domain services for Fleetdesk.
//!
//! Services contain business logic that operates on domain models.

pub mod conflict;

pub use conflict::{find_conflicts, is_available, BookingCandidate};
