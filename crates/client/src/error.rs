use domain::models::reservation::Reservation;
use domain::DomainError;
use thiserror::Error;

/// Errors surfaced to callers of the client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Vehicle already booked: {} conflicting reservation(s)", .0.len())]
    Conflict(Vec<Reservation>),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("A request of this kind is already in flight")]
    Busy,
}

impl From<DomainError> for ClientError {
    fn from(err: DomainError) -> Self {
        ClientError::Validation(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .values()
            .flat_map(|errors| errors.iter())
            .map(|e| {
                e.message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        ClientError::Validation(messages.join("; "))
    }
}
