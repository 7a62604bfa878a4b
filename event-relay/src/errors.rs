use crate::mixpanel::VendorError;
use thiserror::Error;

/// Result type alias for event-relay operations
pub type Result<T, E = RelayError> = std::result::Result<T, E>;

/// Inbound fields whose absence rejects a request before any vendor call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    EventName,
    UserId,
}

impl RequiredField {
    /// Message returned to the caller in the 400 body.
    pub const fn message(&self) -> &'static str {
        match self {
            RequiredField::EventName => "Se requiere un nombre de evento",
            RequiredField::UserId => "Se requiere un ID de usuario",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            RequiredField::EventName => "event",
            RequiredField::UserId => "userId",
        }
    }
}

/// Errors that can occur while handling a relay request
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Missing required field: {}", .0.as_str())]
    MissingField(RequiredField),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Failed to read request body: {0}")]
    RequestBodyError(String),

    #[error("Invalid properties for event {event}: {reason}")]
    InvalidProperties { event: String, reason: String },

    #[error("Vendor call failed: {0}")]
    Vendor(#[from] VendorError),

    #[error("Vendor task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
