//! Shared reqwest plumbing for the backend REST adapters.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder};

use crate::domain::foundation::ErrorCode;
use crate::ports::{ApiError, CredentialStore};

use super::envelope::Envelope;

/// REST client for the device backend.
///
/// Implements `AuthApi`, `DeviceApi`, `FirmwareApi` and `ModelApi`.
/// Authenticated calls read the credential from the `CredentialStore` on
/// every request, so a login or logout takes effect immediately.
#[derive(Clone)]
pub struct HttpBackendClient {
    http: Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpBackendClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(super) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request without credentials (login, register).
    pub(super) fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// Request carrying the stored credential.
    pub(super) async fn authorized(
        &self,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, ApiError> {
        let credential = self
            .credentials
            .load()
            .await
            .map_err(|e| ApiError::client_error(e.to_string()))?
            .ok_or_else(|| {
                ApiError::from_code(ErrorCode::Unauthenticated, "No stored credential")
            })?;

        Ok(self
            .http
            .request(method, self.url(path))
            .header(AUTHORIZATION, credential.authorization_header()))
    }

    /// Sends a request and unwraps the reply envelope.
    pub(super) async fn send(&self, request: RequestBuilder) -> Result<Envelope, ApiError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, timeout = e.is_timeout(), "Backend request failed");
            ApiError::client_error(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::client_error(e.to_string()))?;

        let envelope = Envelope::from_body(status, &body);
        if let Err(ref error) = envelope {
            tracing::debug!(status = status.as_u16(), code = %error.code, "Backend returned failure");
        }
        envelope
    }
}

impl std::fmt::Debug for HttpBackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackendClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
