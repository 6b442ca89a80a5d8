//! Identity of the caller, as reported by the fronting application.
//!
//! There is no authentication layer; the header value is recorded as the
//! author of saved reports and nothing more.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// User id recorded when the header is absent or blank.
pub const DEFAULT_USER_ID: &str = "system";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser(pub String);

impl ActingUser {
    fn from_header(value: Option<&str>) -> Result<Self, ApiError> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(ActingUser(DEFAULT_USER_ID.to_string())),
            Some(id) => {
                shared::validation::validate_user_id(id).map_err(|e| {
                    ApiError::Validation(
                        e.message
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| "Invalid user id".to_string()),
                    )
                })?;
                Ok(ActingUser(id.to_string()))
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = match parts.headers.get(USER_ID_HEADER) {
            Some(v) => Some(
                v.to_str()
                    .map_err(|_| ApiError::Validation("X-User-Id must be ASCII".to_string()))?,
            ),
            None => None,
        };
        Self::from_header(raw)
    }
}
