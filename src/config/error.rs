//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Backend URL must start with http:// or https://")]
    InvalidBackendUrl,

    #[error("Realtime URL must start with ws:// or wss://")]
    InvalidRealtimeUrl,

    #[error("Buffer capacity must be at least 1")]
    InvalidBufferCapacity,

    #[error("Reconnect base delay must be positive and not exceed the max delay")]
    InvalidBackoff,

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
}
