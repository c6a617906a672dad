//! Application configuration module
//!
//! Configuration is loaded from environment variables (and a `.env` file if
//! present) using the `config` and `dotenvy` crates. Variables use the
//! `DEVICE_CONSOLE` prefix and `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use device_console::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Backend at {}", config.backend.base_url);
//! ```

mod backend;
mod credentials;
mod error;
mod logging;
mod realtime;

pub use backend::BackendConfig;
pub use credentials::CredentialsConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use realtime::{RealtimeConfig, ReconnectConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Backend REST and realtime endpoints
    pub backend: BackendConfig,

    /// Realtime channel buffers, close timeout and reconnect policy
    #[serde(default)]
    pub realtime: RealtimeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Credential file and optional unattended login
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Environment Variable Format
    ///
    /// - `DEVICE_CONSOLE__BACKEND__BASE_URL=https://...` -> `backend.base_url`
    /// - `DEVICE_CONSOLE__REALTIME__RECONNECT__ENABLED=true` -> `realtime.reconnect.enabled`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("DEVICE_CONSOLE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.backend.validate()?;
        self.realtime.validate()?;
        self.logging.validate()?;
        self.credentials.validate()?;
        Ok(())
    }
}
