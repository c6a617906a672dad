//! Mock authentication adapters for testing.
//!
//! # Example
//!
//! ```ignore
//! use device_console::adapters::auth::MockAuthApi;
//!
//! let api = MockAuthApi::new().with_test_user("alice", "secret", "tok-alice");
//! let grant = api.authenticate("alice", &Secret::new("secret".into())).await?;
//! assert_eq!(grant.credential.token(), "tok-alice");
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};

use crate::domain::foundation::{AuthError, BearerCredential, UserId, UserIdentity};
use crate::ports::{
    ApiError, ApiResponse, ApiResult, AuthApi, CredentialStore, CredentialStoreError, LoginGrant,
    Registration,
};

#[derive(Debug, Clone)]
struct Account {
    password: String,
    token: String,
}

/// Mock auth API.
///
/// Accounts map a username to a password and the token issued on login.
/// Tokens not known to the mock fail verification with `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockAuthApi {
    accounts: RwLock<HashMap<String, Account>>,
    tokens: RwLock<HashMap<String, UserIdentity>>,
    registrations: RwLock<Vec<String>>,
    force_error: RwLock<Option<AuthError>>,
}

impl MockAuthApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account whose login issues `token` for `identity`.
    pub fn with_account(
        self,
        username: impl Into<String>,
        password: impl Into<String>,
        token: impl Into<String>,
        identity: UserIdentity,
    ) -> Self {
        let token = token.into();
        self.accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                username.into(),
                Account {
                    password: password.into(),
                    token: token.clone(),
                },
            );
        self.add_token(token, identity);
        self
    }

    /// Adds an account with a generated identity (`id` = username).
    pub fn with_test_user(
        self,
        username: &str,
        password: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let identity = match UserId::new(username) {
            Ok(id) => UserIdentity::new(id, username, format!("{}@test.example.com", username)),
            Err(_) => return self,
        };
        self.with_account(username, password, token, identity)
    }

    /// Forces every call to fail with `error`.
    pub fn with_error(self, error: AuthError) -> Self {
        *self.force_error.write().unwrap_or_else(PoisonError::into_inner) = Some(error);
        self
    }

    pub fn clear_error(&self) {
        *self.force_error.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Registers a token at runtime.
    pub fn add_token(&self, token: impl Into<String>, identity: UserIdentity) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), identity);
    }

    /// Revokes a token so it fails verification.
    pub fn revoke_token(&self, token: &str) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
    }

    /// Emails registered through [`AuthApi::register`].
    pub fn registered_emails(&self) -> Vec<String> {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn forced(&self) -> Option<AuthError> {
        self.force_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn authenticate(
        &self,
        username: &str,
        password: &Secret<String>,
    ) -> Result<LoginGrant, AuthError> {
        if let Some(error) = self.forced() {
            return Err(error);
        }

        let account = self
            .accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(username)
            .filter(|a| a.password == *password.expose_secret())
            .cloned()
            .ok_or(AuthError::InvalidCredentials)?;

        let credential = BearerCredential::new(account.token, "bearer");
        let identity = self.verify_token(&credential).await?;
        Ok(LoginGrant {
            identity,
            credential,
        })
    }

    async fn verify_token(&self, credential: &BearerCredential) -> Result<UserIdentity, AuthError> {
        if let Some(error) = self.forced() {
            return Err(error);
        }

        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(credential.token())
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }

    async fn register(&self, registration: &Registration) -> ApiResult<()> {
        let mut registrations = self
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if registrations.contains(&registration.email) {
            return Err(ApiError::new("EMAIL_ALREADY_EXISTS", "Email already registered"));
        }
        registrations.push(registration.email.clone());
        Ok(ApiResponse::new("Register successfully.", ()))
    }
}

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credential: RwLock<Option<BearerCredential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: BearerCredential) -> Self {
        Self {
            credential: RwLock::new(Some(credential)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self) -> Result<Option<BearerCredential>, CredentialStoreError> {
        Ok(self
            .credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn save(&self, credential: &BearerCredential) -> Result<(), CredentialStoreError> {
        *self.credential.write().unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialStoreError> {
        *self.credential.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password(p: &str) -> Secret<String> {
        Secret::new(p.to_string())
    }

    #[tokio::test]
    async fn authenticate_issues_configured_token() {
        let api = MockAuthApi::new().with_test_user("alice", "pw", "tok-alice");

        let grant = api.authenticate("alice", &password("pw")).await.unwrap();

        assert_eq!(grant.credential.token(), "tok-alice");
        assert_eq!(grant.identity.id.as_str(), "alice");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let api = MockAuthApi::new().with_test_user("alice", "pw", "tok-alice");

        let result = api.authenticate("alice", &password("nope")).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn revoked_token_fails_verification() {
        let api = MockAuthApi::new().with_test_user("alice", "pw", "tok-alice");
        api.revoke_token("tok-alice");

        let result = api
            .verify_token(&BearerCredential::new("tok-alice", "bearer"))
            .await;

        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn forced_error_applies_to_every_call() {
        let api = MockAuthApi::new()
            .with_test_user("alice", "pw", "tok-alice")
            .with_error(AuthError::service_unavailable("down"));

        assert!(matches!(
            api.authenticate("alice", &password("pw")).await,
            Err(AuthError::ServiceUnavailable(_))
        ));

        api.clear_error();
        assert!(api.authenticate("alice", &password("pw")).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_registration_is_refused() {
        let api = MockAuthApi::new();
        let registration = Registration {
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
            password: password("pw"),
        };

        assert!(api.register(&registration).await.is_ok());
        let err = api.register(&registration).await.unwrap_err();

        assert_eq!(err.code, "EMAIL_ALREADY_EXISTS");
        assert_eq!(api.registered_emails(), vec!["bob@example.com".to_string()]);
    }

    #[tokio::test]
    async fn in_memory_store_round_trips_and_clears() {
        let store = InMemoryCredentialStore::new();
        assert!(store.load().await.unwrap().is_none());

        store.save(&BearerCredential::new("t", "bearer")).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap().token(), "t");

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert!(store.is_empty());
    }
}
