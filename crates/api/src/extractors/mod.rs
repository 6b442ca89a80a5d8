//! Custom Axum extractors.

pub mod acting_user;

pub use acting_user::{ActingUser, DEFAULT_USER_ID, USER_ID_HEADER};
