//! Authentication API port.
//!
//! Issues and verifies bearer credentials. The session provider is the only
//! caller; the realtime channel never talks to this port directly.

use async_trait::async_trait;
use secrecy::Secret;

use crate::domain::foundation::{AuthError, BearerCredential, UserIdentity};

use super::ApiResult;

/// Credential issued by a successful login, together with its owner.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub identity: UserIdentity,
    pub credential: BearerCredential,
}

/// New account details.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: Secret<String>,
}

/// Issues and validates bearer credentials.
///
/// # Contract
///
/// Implementations must:
/// - Return `AuthError::InvalidCredentials` when username/password are rejected
/// - Return `AuthError::InvalidToken` when a credential fails verification
/// - Return `AuthError::ServiceUnavailable` when no usable reply was received
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchanges username and password for a bearer credential.
    async fn authenticate(
        &self,
        username: &str,
        password: &Secret<String>,
    ) -> Result<LoginGrant, AuthError>;

    /// Resolves the identity a credential was issued to.
    async fn verify_token(&self, credential: &BearerCredential) -> Result<UserIdentity, AuthError>;

    /// Creates an account. Failures are surfaced verbatim.
    async fn register(&self, registration: &Registration) -> ApiResult<()>;
}
