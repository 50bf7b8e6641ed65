//! Authentication service.
//!
//! Sign-in, sign-up, and session restoration are delegated to an external
//! identity provider behind the [`IdentityProvider`] trait:
//!
//! - [`HostedAuthClient`] talks to the hosted backend's auth API
//! - [`MemoryIdentityProvider`] keeps argon2-hashed accounts in memory
//! - [`DisabledIdentityProvider`] answers every call with `NotConfigured`
//!
//! Input validation happens here, before any provider is called.

mod error;
mod hosted;
mod memory;

pub use error::AuthError;
pub use hosted::HostedAuthClient;
pub use memory::MemoryIdentityProvider;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;

use beanvoyage_core::Email;

use crate::models::Identity;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Result of a successful sign-in or sign-up.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity: Identity,
    /// Bearer token for later provider calls. Absent after a sign-up that
    /// still needs email confirmation.
    pub access_token: Option<SecretString>,
}

/// Raw sign-up form as submitted by the shopper.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Sign-up input that passed validation.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: Email,
    pub password: SecretString,
    pub first_name: String,
    pub last_name: String,
}

impl SignUpForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::MissingField` if a name is blank.
    pub fn validate(self) -> Result<SignUpRequest, AuthError> {
        if self.password != self.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(&self.password)?;
        let email = Email::parse(&self.email)?;

        let first_name = self.first_name.trim().to_owned();
        if first_name.is_empty() {
            return Err(AuthError::MissingField("First name"));
        }
        let last_name = self.last_name.trim().to_owned();
        if last_name.is_empty() {
            return Err(AuthError::MissingField("Last name"));
        }

        Ok(SignUpRequest {
            email,
            password: SecretString::from(self.password),
            first_name,
            last_name,
        })
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// External identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<AuthSession, AuthError>;

    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, AuthError>;

    /// Revoke `access_token`.
    async fn sign_out(&self, access_token: &SecretString) -> Result<(), AuthError>;

    /// The identity behind `access_token`, or `None` if it is no longer valid.
    async fn get_user(&self, access_token: &SecretString) -> Result<Option<Identity>, AuthError>;

    /// Send a password recovery email.
    async fn reset_password(&self, email: &Email) -> Result<(), AuthError>;
}

/// Provider used when no backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledIdentityProvider;

#[async_trait]
impl IdentityProvider for DisabledIdentityProvider {
    async fn sign_up(&self, _request: &SignUpRequest) -> Result<AuthSession, AuthError> {
        Err(AuthError::NotConfigured)
    }

    async fn sign_in(
        &self,
        _email: &Email,
        _password: &SecretString,
    ) -> Result<AuthSession, AuthError> {
        Err(AuthError::NotConfigured)
    }

    async fn sign_out(&self, _access_token: &SecretString) -> Result<(), AuthError> {
        Ok(())
    }

    async fn get_user(&self, _access_token: &SecretString) -> Result<Option<Identity>, AuthError> {
        Ok(None)
    }

    async fn reset_password(&self, _email: &Email) -> Result<(), AuthError> {
        Err(AuthError::NotConfigured)
    }
}
