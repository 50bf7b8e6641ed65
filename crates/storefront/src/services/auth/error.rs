//! Authentication error types.

use thiserror::Error;

use beanvoyage_core::EmailError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// A required sign-up field was blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// The storefront runs without an identity provider.
    #[error("Authentication service is not configured")]
    NotConfigured,

    /// The identity provider rejected the request.
    #[error("identity provider error: {0}")]
    Provider(String),

    /// HTTP request to the identity provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Message safe to show the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Invalid email address".to_owned(),
            Self::MissingField(field) => format!("{field} is required"),
            Self::PasswordMismatch | Self::NotConfigured => self.to_string(),
            Self::WeakPassword(msg) | Self::Provider(msg) => msg.clone(),
            Self::InvalidCredentials => "Invalid login credentials".to_owned(),
            Self::UserAlreadyExists => "An account with this email already exists".to_owned(),
            Self::Http(_) => "Authentication service is unavailable".to_owned(),
            Self::PasswordHash => "Authentication error".to_owned(),
        }
    }

    /// Whether the caller supplied bad input, as opposed to a service failure.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidEmail(_)
                | Self::MissingField(_)
                | Self::PasswordMismatch
                | Self::WeakPassword(_)
        )
    }
}
