//! File-backed credential store.
//!
//! Persists the credential as a small JSON document:
//!
//! ```json
//! { "access_token": "...", "token_type": "bearer" }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::domain::foundation::BearerCredential;
use crate::ports::{CredentialStore, CredentialStoreError};

#[derive(Serialize, Deserialize)]
struct StoredCredential {
    access_token: String,
    token_type: String,
}

/// Stores the bearer credential in a single JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<BearerCredential>, CredentialStoreError> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredCredential = serde_json::from_str(&json)
            .map_err(|e| CredentialStoreError::Corrupt(e.to_string()))?;

        if stored.access_token.is_empty() {
            return Ok(None);
        }

        Ok(Some(BearerCredential::new(
            stored.access_token,
            stored.token_type,
        )))
    }

    async fn save(&self, credential: &BearerCredential) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let stored = StoredCredential {
            access_token: credential.token().to_string(),
            token_type: credential.scheme().to_string(),
        };
        let json = serde_json::to_string(&stored)
            .map_err(|e| CredentialStoreError::Corrupt(e.to_string()))?;

        // Write then rename so a crash never leaves a half-written file.
        let staging = self.staging_path();
        fs::write(&staging, json).await?;
        fs::rename(&staging, &self.path).await?;

        tracing::debug!(path = %self.path.display(), "Credential persisted");
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialStoreError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
