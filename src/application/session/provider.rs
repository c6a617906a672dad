//! SessionProvider - owns the current session and publishes its changes.

use std::sync::Arc;

use secrecy::Secret;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::domain::foundation::{AuthError, Session, Timestamp};
use crate::ports::{ApiResult, AuthApi, CredentialStore, CredentialStoreError, Registration};

fn storage_error(error: CredentialStoreError) -> AuthError {
    AuthError::Storage(error.to_string())
}

/// Holds the authenticated session.
///
/// Consumers follow it through [`SessionProvider::subscribe`]; the realtime
/// channel binds to that receiver.
pub struct SessionProvider {
    auth_api: Arc<dyn AuthApi>,
    store: Arc<dyn CredentialStore>,
    session_tx: watch::Sender<Option<Session>>,
}

impl SessionProvider {
    pub fn new(auth_api: Arc<dyn AuthApi>, store: Arc<dyn CredentialStore>) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self {
            auth_api,
            store,
            session_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session_tx.subscribe()
    }

    pub fn current(&self) -> Option<Session> {
        self.session_tx.borrow().clone()
    }

    /// Logs in, persists the issued credential and publishes the session.
    pub async fn login(
        &self,
        username: &str,
        password: &Secret<String>,
    ) -> Result<Session, AuthError> {
        let grant = self.auth_api.authenticate(username, password).await?;
        self.store
            .save(&grant.credential)
            .await
            .map_err(storage_error)?;

        let session = Session::new(grant.identity, grant.credential);
        info!(user_id = %session.user_id(), "Logged in");
        self.publish(Some(session.clone()));
        Ok(session)
    }

    /// Restores a session from the persisted credential.
    ///
    /// Returns `Ok(None)` when nothing is stored, the credential has expired
    /// or the backend rejects it; in the last two cases the store is
    /// cleared. A backend outage leaves the stored credential in place.
    pub async fn restore(&self) -> Result<Option<Session>, AuthError> {
        let Some(credential) = self.store.load().await.map_err(storage_error)? else {
            return Ok(None);
        };

        if credential.is_expired(&Timestamp::now()) {
            info!("Stored credential expired, discarding");
            self.store.clear().await.map_err(storage_error)?;
            return Ok(None);
        }

        match self.auth_api.verify_token(&credential).await {
            Ok(identity) => {
                let session = Session::new(identity, credential);
                info!(user_id = %session.user_id(), "Session restored");
                self.publish(Some(session.clone()));
                Ok(Some(session))
            }
            Err(error) if error.requires_reauthentication() => {
                warn!(error = %error, "Stored credential rejected, discarding");
                self.store.clear().await.map_err(storage_error)?;
                self.publish(None);
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// Ends the session. Safe to call without a session.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Some(session) = self.current() {
            info!(user_id = %session.user_id(), "Logging out");
        }
        self.publish(None);
        self.store.clear().await.map_err(storage_error)
    }

    pub async fn register(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        password: Secret<String>,
    ) -> ApiResult<()> {
        let registration = Registration {
            name: name.into(),
            email: email.into(),
            password,
        };
        self.auth_api.register(&registration).await
    }

    fn publish(&self, session: Option<Session>) {
        self.session_tx.send_if_modified(|current| {
            let changed = match (current.as_ref(), session.as_ref()) {
                (None, None) => false,
                (Some(a), Some(b)) => {
                    a.identity != b.identity || a.credential.token() != b.credential.token()
                }
                _ => true,
            };
            *current = session;
            changed
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryCredentialStore, MockAuthApi};
    use crate::domain::foundation::BearerCredential;

    fn password(value: &str) -> Secret<String> {
        Secret::new(value.to_string())
    }

    fn provider(api: MockAuthApi, store: Arc<InMemoryCredentialStore>) -> SessionProvider {
        SessionProvider::new(Arc::new(api), store)
    }

    fn api() -> MockAuthApi {
        MockAuthApi::new().with_test_user("alice", "secret", "tok-alice")
    }

    #[tokio::test]
    async fn login_persists_and_publishes() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let provider = provider(api(), Arc::clone(&store));
        let mut rx = provider.subscribe();

        let session = provider.login("alice", &password("secret")).await.unwrap();

        assert_eq!(session.user_id().as_str(), "alice");
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow_and_update().as_ref().map(|s| s.user_id().clone()),
            Some(session.user_id().clone())
        );
        assert_eq!(store.load().await.unwrap().unwrap().token(), "tok-alice");
    }

    #[tokio::test]
    async fn failed_login_publishes_nothing() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let provider = provider(api(), Arc::clone(&store));

        let err = provider.login("alice", &password("wrong")).await.unwrap_err();

        assert_eq!(err, AuthError::InvalidCredentials);
        assert!(provider.current().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn restore_verifies_stored_credential() {
        let store = Arc::new(InMemoryCredentialStore::with_credential(BearerCredential::new(
            "tok-alice",
            "bearer",
        )));
        let provider = provider(api(), store);

        let session = provider.restore().await.unwrap().unwrap();

        assert_eq!(session.identity.name, "alice");
        assert!(provider.current().is_some());
    }

    #[tokio::test]
    async fn restore_without_credential_is_none() {
        let provider = provider(api(), Arc::new(InMemoryCredentialStore::new()));
        assert!(provider.restore().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_credential_is_cleared() {
        let store = Arc::new(InMemoryCredentialStore::with_credential(BearerCredential::new(
            "revoked",
            "bearer",
        )));
        let provider = provider(api(), Arc::clone(&store));

        assert!(provider.restore().await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn outage_keeps_stored_credential() {
        let store = Arc::new(InMemoryCredentialStore::with_credential(BearerCredential::new(
            "tok-alice",
            "bearer",
        )));
        let api = api().with_error(AuthError::service_unavailable("down"));
        let provider = provider(api, Arc::clone(&store));

        let err = provider.restore().await.unwrap_err();

        assert!(matches!(err, AuthError::ServiceUnavailable(_)));
        assert!(!store.is_empty());
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let provider = provider(api(), Arc::clone(&store));
        provider.login("alice", &password("secret")).await.unwrap();

        provider.logout().await.unwrap();
        provider.logout().await.unwrap();

        assert!(provider.current().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn relogin_as_same_user_does_not_notify() {
        let provider = provider(api(), Arc::new(InMemoryCredentialStore::new()));
        provider.login("alice", &password("secret")).await.unwrap();
        let mut rx = provider.subscribe();

        provider.login("alice", &password("secret")).await.unwrap();

        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn register_delegates_to_api() {
        let api = Arc::new(api());
        let provider = SessionProvider::new(
            Arc::clone(&api) as Arc<dyn AuthApi>,
            Arc::new(InMemoryCredentialStore::new()),
        );

        provider
            .register("Bob", "bob@example.com", password("pw"))
            .await
            .unwrap();
        let err = provider
            .register("Bob", "bob@example.com", password("pw"))
            .await
            .unwrap_err();

        assert_eq!(api.registered_emails(), vec!["bob@example.com".to_string()]);
        assert_eq!(err.code, "EMAIL_ALREADY_EXISTS");
    }
}
