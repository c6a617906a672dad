//! Backend reply envelope.
//!
//! Success and handled failure share one JSON shape:
//!
//! ```json
//! { "success": true,  "message": "...", "data": { "devices": [...] } }
//! { "success": false, "message": "...", "code": "...", "details": ... }
//! { "success": false, "message": "...", "error": { "code": "...", "details": ... } }
//! ```
//!
//! Both failure layouts are accepted; the nested one is what the backend's
//! global error handler emits.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::foundation::ErrorCode;
use crate::ports::{ApiError, ApiResponse, ApiResult};

const DEFAULT_ERROR_MESSAGE: &str = "An API error occurred.";

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<Value>,
}

/// A reply that was recognised as successful.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<Value>,
    #[serde(default)]
    error: Option<ErrorBody>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl Envelope {
    /// Interprets a raw reply. Handled failures become `ApiError`.
    pub fn from_body(status: StatusCode, body: &[u8]) -> Result<Self, ApiError> {
        let envelope: Envelope = match serde_json::from_slice(body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(ApiError::unknown(format!("Unreadable response body: {}", e)))
            }
            Err(_) => return Err(ApiError::unknown(format!("HTTP {}", status))),
        };

        if status.is_success() && envelope.success != Some(false) {
            return Ok(envelope);
        }

        Err(envelope.into_error(status))
    }

    fn into_error(self, status: StatusCode) -> ApiError {
        let nested = self.error.unwrap_or_default();
        let code = self
            .code
            .or(nested.code)
            .unwrap_or_else(|| ErrorCode::UnknownApiError.to_string());
        let message = if self.message.is_empty() {
            format!("{} (HTTP {})", DEFAULT_ERROR_MESSAGE, status.as_u16())
        } else {
            self.message
        };

        let error = ApiError::new(code, message);
        match self.details.or(nested.details).filter(|d| !d.is_null()) {
            Some(details) => error.with_details(details),
            None => error,
        }
    }

    /// Reply without a payload of interest.
    pub fn into_unit(self) -> ApiResult<()> {
        Ok(ApiResponse::new(self.message, ()))
    }

    /// The array under `data.<key>`; absent means empty.
    pub fn into_list<T: DeserializeOwned>(self, key: &str) -> ApiResult<Vec<T>> {
        let field = match self.data {
            Some(Value::Object(mut data)) => data.remove(key),
            _ => None,
        };
        let items = match field {
            Some(Value::Null) | None => Vec::new(),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| ApiError::unknown(format!("Malformed '{}' in response: {}", key, e)))?,
        };
        Ok(ApiResponse::new(self.message, items))
    }

    /// The first element of the array under `data.<key>`.
    pub fn into_first<T: DeserializeOwned>(self, key: &str) -> ApiResult<T> {
        let ApiResponse { message, data } = self.into_list::<T>(key)?;
        data.into_iter()
            .next()
            .map(|item| ApiResponse::new(message, item))
            .ok_or_else(|| ApiError::unknown(format!("Response carried no '{}'", key)))
    }

    /// The whole `data` object.
    pub fn into_data<T: DeserializeOwned>(self) -> ApiResult<T> {
        let data = serde_json::from_value(self.data.unwrap_or(Value::Null))
            .map_err(|e| ApiError::unknown(format!("Malformed response data: {}", e)))?;
        Ok(ApiResponse::new(self.message, data))
    }
}
