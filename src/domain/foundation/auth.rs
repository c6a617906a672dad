//! Authentication types for the domain layer.
//!
//! A [`Session`] is what the rest of the crate sees of a logged-in user: the
//! identity returned by the backend and the bearer credential it issued.
//! The realtime layer only reads sessions; it never creates or destroys them.
//!
//! # Example
//!
//! ```ignore
//! let session = Session::new(
//!     UserIdentity::new(UserId::new("u-1")?, "alice", "alice@example.com"),
//!     BearerCredential::new("eyJ...", "bearer"),
//! );
//! assert_eq!(session.user_id().as_str(), "u-1");
//! ```

use jsonwebtoken::{DecodingKey, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use thiserror::Error;

use super::{Timestamp, UserId};

/// Identity of the authenticated user, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl UserIdentity {
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Opaque bearer credential (token value + token scheme).
///
/// The token is kept in a [`Secret`] so it never shows up in `Debug` output
/// or logs.
#[derive(Debug, Clone)]
pub struct BearerCredential {
    token: Secret<String>,
    scheme: String,
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

impl BearerCredential {
    pub fn new(token: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self {
            token: Secret::new(token.into()),
            scheme: scheme.into(),
        }
    }

    /// Token scheme as issued (typically `bearer`).
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Raw token value. Callers must not log it.
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    /// Renders the `Authorization` header value.
    pub fn authorization_header(&self) -> String {
        let scheme = if self.scheme.eq_ignore_ascii_case("bearer") || self.scheme.is_empty() {
            "Bearer"
        } else {
            self.scheme.as_str()
        };
        format!("{} {}", scheme, self.token.expose_secret())
    }

    /// Expiry of a JWT credential, read from the unverified `exp` claim.
    ///
    /// The signature is not checked: this is only used to avoid presenting a
    /// credential that is already known to be stale. Opaque tokens yield `None`.
    pub fn expires_at(&self) -> Option<Timestamp> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<ExpiryClaim>(
            self.token.expose_secret(),
            &DecodingKey::from_secret(&[]),
            &validation,
        )
        .ok()?;

        data.claims.exp.and_then(Timestamp::from_unix_secs)
    }

    /// True when the credential carries an expiry that is not after `now`.
    pub fn is_expired(&self, now: &Timestamp) -> bool {
        self.expires_at()
            .map(|exp| !exp.is_after(now))
            .unwrap_or(false)
    }
}

/// An authenticated session: identity plus the credential it was issued.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: UserIdentity,
    pub credential: BearerCredential,
}

impl Session {
    pub fn new(identity: UserIdentity, credential: BearerCredential) -> Self {
        Self {
            identity,
            credential,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.identity.id
    }
}

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Username/password rejected.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The token is missing, malformed, or was rejected by the backend.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token is known to be expired.
    #[error("Token expired")]
    TokenExpired,

    /// The backend could not be reached or answered unexpectedly.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Persisting or loading the credential failed.
    #[error("Credential storage failed: {0}")]
    Storage(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this error indicates the user should log in again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::TokenExpired
        )
    }
}
