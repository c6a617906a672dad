//! Uniform REST result types.
//!
//! The backend wraps every reply in `{success, message, data?, code?, details?}`.
//! Adapters unwrap that envelope into a `Result`: `Ok(ApiResponse)` on success,
//! `Err(ApiError)` on handled failure or when no response was received at all.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::ErrorCode;

/// Successful REST reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            message: self.message,
            data: f(self.data),
        }
    }
}

/// Failed REST call, surfaced to the user verbatim.
///
/// `code` carries the server's code unchanged; client-side failures use the
/// codes in [`ErrorCode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code.as_str(), message)
    }

    /// No response was received (connect, timeout, TLS or body read failure).
    pub fn client_error(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::ClientError, message)
    }

    /// A failure body arrived but could not be interpreted.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::UnknownApiError, message)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code.as_str()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result of one REST call.
pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
