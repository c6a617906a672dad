//! `AuthApi` over `/api/user`.

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Method;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::json;

use crate::domain::foundation::{AuthError, BearerCredential, UserId, UserIdentity};
use crate::ports::{ApiError, ApiResult, AuthApi, LoginGrant, Registration};

use super::client::HttpBackendClient;

const CODE_BAD_CREDENTIALS: &str = "USER_AUTHENTICATION";
const CODE_TOKEN_INVALID: &str = "TOKEN_INVALID";
const CODE_TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";

/// User payload carried by login and verification replies.
#[derive(Debug, Deserialize)]
struct UserPayload {
    user_id: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
}

impl UserPayload {
    fn into_identity(self) -> Result<UserIdentity, AuthError> {
        let id = UserId::new(self.user_id)
            .map_err(|e| AuthError::service_unavailable(format!("bad user payload: {}", e)))?;
        Ok(UserIdentity::new(id, self.username, self.email))
    }
}

/// Maps a backend failure onto the auth taxonomy.
fn auth_error(error: ApiError, rejected: AuthError) -> AuthError {
    match error.code.as_str() {
        CODE_BAD_CREDENTIALS | CODE_TOKEN_INVALID => rejected,
        CODE_TOKEN_EXPIRED => AuthError::TokenExpired,
        _ => AuthError::service_unavailable(error.to_string()),
    }
}

#[async_trait]
impl AuthApi for HttpBackendClient {
    async fn authenticate(
        &self,
        username: &str,
        password: &Secret<String>,
    ) -> Result<LoginGrant, AuthError> {
        let form = Form::new()
            .text("username", username.to_string())
            .text("password", password.expose_secret().clone());
        let request = self.anonymous(Method::POST, "/api/user/login").multipart(form);

        let envelope = self
            .send(request)
            .await
            .map_err(|e| auth_error(e, AuthError::InvalidCredentials))?;

        let token = envelope
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::service_unavailable("login reply carried no token"))?;
        let scheme = envelope
            .token_type
            .clone()
            .unwrap_or_else(|| "bearer".to_string());

        let user = envelope
            .into_data::<UserPayload>()
            .map_err(|e| AuthError::service_unavailable(e.to_string()))?
            .data;

        Ok(LoginGrant {
            identity: user.into_identity()?,
            credential: BearerCredential::new(token, scheme),
        })
    }

    async fn verify_token(&self, credential: &BearerCredential) -> Result<UserIdentity, AuthError> {
        let request = self
            .anonymous(Method::GET, "/api/user/verification")
            .header(
                reqwest::header::AUTHORIZATION,
                credential.authorization_header(),
            );

        let user = self
            .send(request)
            .await
            .and_then(|envelope| envelope.into_data::<UserPayload>())
            .map_err(|e| auth_error(e, AuthError::InvalidToken))?
            .data;

        user.into_identity()
    }

    async fn register(&self, registration: &Registration) -> ApiResult<()> {
        let request = self
            .anonymous(Method::POST, "/api/user/register")
            .json(&json!({
                "name": registration.name,
                "email": registration.email,
                "password": registration.password.expose_secret(),
            }));

        self.send(request).await?.into_unit()
    }
}
