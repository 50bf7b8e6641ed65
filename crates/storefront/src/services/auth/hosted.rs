//! Client for the hosted backend's auth API.
//!
//! The API is `GoTrue`-compatible and served under `{BACKEND_URL}/auth/v1/`.
//! Every request carries the public `apikey` header; calls made on behalf of
//! a signed-in user add their access token as a bearer token.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

use beanvoyage_core::{Email, UserId};

use super::{AuthError, AuthSession, IdentityProvider, SignUpRequest};
use crate::config::BackendConfig;
use crate::models::Identity;

/// Hosted auth API client.
#[derive(Clone)]
pub struct HostedAuthClient {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for HostedAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedAuthClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct UserMetadata {
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: UserResponse,
}

/// Sign-up returns a session when auto-confirm is on, otherwise just the user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(UserResponse),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_code: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    fn message(&self) -> Option<&str> {
        self.error_description
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.message.as_deref())
    }

    fn code(&self) -> Option<&str> {
        self.error_code.as_deref().or(self.error.as_deref())
    }
}

impl UserResponse {
    fn into_identity(self) -> Result<Identity, AuthError> {
        let email = self
            .email
            .as_deref()
            .ok_or_else(|| AuthError::Provider("user has no email address".to_owned()))
            .and_then(|e| Email::parse(e).map_err(AuthError::from))?;
        let (first_name, last_name) = self
            .user_metadata
            .map_or((None, None), |m| (m.first_name, m.last_name));
        Ok(Identity {
            id: UserId::new(self.id),
            email,
            first_name,
            last_name,
        })
    }
}

impl HostedAuthClient {
    /// Create a new hosted auth client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, AuthError> {
        let mut headers = HeaderMap::new();

        let key = config.anon_key.expose_secret();
        let mut api_key = HeaderValue::from_str(key)
            .map_err(|e| AuthError::Provider(format!("Invalid API key format: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert("apikey", api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            base_url: config.auth_url(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.base_url
            .join(path)
            .map_err(|e| AuthError::Provider(format!("invalid auth endpoint {path}: {e}")))
    }

    /// Map a non-success response to an `AuthError`.
    async fn error_from(response: reqwest::Response) -> AuthError {
        let status = response.status();
        let body: ErrorBody = response.json().await.unwrap_or_default();
        classify_error(status, &body)
    }
}

fn classify_error(status: StatusCode, body: &ErrorBody) -> AuthError {
    let message = body.message().unwrap_or("Authentication failed");
    let code = body.code().unwrap_or_default();

    if code == "invalid_credentials" || code == "invalid_grant" {
        return AuthError::InvalidCredentials;
    }
    if code == "user_already_exists" || message.contains("already registered") {
        return AuthError::UserAlreadyExists;
    }
    if status == StatusCode::UNAUTHORIZED {
        return AuthError::InvalidCredentials;
    }
    AuthError::Provider(message.to_owned())
}

#[async_trait]
impl IdentityProvider for HostedAuthClient {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<AuthSession, AuthError> {
        let body = serde_json::json!({
            "email": request.email.as_str(),
            "password": request.password.expose_secret(),
            "data": {
                "first_name": request.first_name,
                "last_name": request.last_name,
            },
        });

        let response = self
            .client
            .post(self.endpoint("signup")?)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let parsed: SignUpResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("unexpected sign-up response: {e}")))?;

        Ok(match parsed {
            SignUpResponse::Session(token) => AuthSession {
                identity: token.user.into_identity()?,
                access_token: Some(SecretString::from(token.access_token)),
            },
            SignUpResponse::User(user) => AuthSession {
                identity: user.into_identity()?,
                access_token: None,
            },
        })
    }

    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, AuthError> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let body = serde_json::json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
        });

        let response = self.client.post(url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("unexpected token response: {e}")))?;

        Ok(AuthSession {
            identity: token.user.into_identity()?,
            access_token: Some(SecretString::from(token.access_token)),
        })
    }

    async fn sign_out(&self, access_token: &SecretString) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.endpoint("logout")?)
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;

        // An already-expired token is as good as signed out
        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(Self::error_from(response).await)
    }

    async fn get_user(&self, access_token: &SecretString) -> Result<Option<Identity>, AuthError> {
        let response = self
            .client
            .get(self.endpoint("user")?)
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let user: UserResponse = response
                    .json()
                    .await
                    .map_err(|e| AuthError::Provider(format!("unexpected user response: {e}")))?;
                user.into_identity().map(Some)
            }
            _ => Err(Self::error_from(response).await),
        }
    }

    async fn reset_password(&self, email: &Email) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.endpoint("recover")?)
            .json(&serde_json::json!({ "email": email.as_str() }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(())
    }
}
