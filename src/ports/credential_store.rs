//! Persisted bearer credential.
//!
//! The only durable client-side state: the credential survives restarts so a
//! session can be restored without asking for the password again.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::BearerCredential;

#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("Credential store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored credential is corrupt: {0}")]
    Corrupt(String),
}

/// Loads, saves and clears the persisted credential.
///
/// # Contract
///
/// - `load` returns `Ok(None)` when nothing is stored
/// - `save` replaces any previously stored credential
/// - `clear` is idempotent
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<BearerCredential>, CredentialStoreError>;

    async fn save(&self, credential: &BearerCredential) -> Result<(), CredentialStoreError>;

    async fn clear(&self) -> Result<(), CredentialStoreError>;
}
