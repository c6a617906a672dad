//! Error types for the domain layer.

use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error codes synthesized on the client side.
///
/// Codes returned by the backend are carried verbatim as strings; these are
/// the ones this crate produces itself when no server code is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Request never produced a response (connect/timeout/TLS failure).
    ClientError,
    /// Server answered with a failure body that could not be parsed.
    UnknownApiError,
    /// A device command was refused because a job is already outstanding.
    DeviceBusy,
    /// A device command referenced a device missing from local state.
    DeviceNotFound,
    /// No bearer credential is available for an authenticated call.
    Unauthenticated,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ClientError => "CLIENT_ERROR",
            ErrorCode::UnknownApiError => "UNKNOWN_API_ERROR",
            ErrorCode::DeviceBusy => "DEVICE_BUSY",
            ErrorCode::DeviceNotFound => "DEVICE_NOT_FOUND",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
