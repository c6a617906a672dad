//! Credential persistence and unattended login

use secrecy::Secret;
use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Where the bearer credential is kept, plus optional login credentials
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Used when no stored credential can be restored
    pub username: Option<String>,

    pub password: Option<Secret<String>>,
}

impl CredentialsConfig {
    /// Username and password, when both are configured.
    pub fn login(&self) -> Option<(&str, &Secret<String>)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username.as_str(), password)),
            _ => None,
        }
    }

    /// Validate credentials configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.path.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("CREDENTIALS__PATH"));
        }
        if self.username.is_some() && self.password.is_none() {
            return Err(ValidationError::MissingRequired("CREDENTIALS__PASSWORD"));
        }
        Ok(())
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            username: None,
            password: None,
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from(".device-console/credential.json")
}
