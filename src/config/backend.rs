//! Backend endpoint configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// REST and realtime endpoints of the device backend
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// REST base URL, e.g. `https://devices.example.com`
    pub base_url: String,

    /// Realtime base URL; derived from `base_url` when absent
    pub ws_base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Realtime base URL (`http` → `ws`, `https` → `wss` when derived).
    pub fn realtime_base_url(&self) -> String {
        if let Some(url) = &self.ws_base_url {
            return url.trim_end_matches('/').to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        }
    }

    /// Validate backend configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("BACKEND__BASE_URL"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBackendUrl);
        }
        if let Some(ws) = &self.ws_base_url {
            if !ws.starts_with("ws://") && !ws.starts_with("wss://") {
                return Err(ValidationError::InvalidRealtimeUrl);
            }
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_request_timeout() -> u64 {
    30
}
