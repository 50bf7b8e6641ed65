//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use beanvoyage_core::{Email, UserId};

/// An authenticated user as reported by the identity provider.
///
/// This is the only thing the cart store looks at to decide whether a cart
/// is persisted, and under which key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-issued user id.
    pub id: UserId,
    /// Sign-in email address.
    pub email: Email,
    /// Given name from sign-up metadata.
    pub first_name: Option<String>,
    /// Family name from sign-up metadata.
    pub last_name: Option<String>,
}

impl Identity {
    /// Name to greet the user with, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.to_owned(),
            (None, None) => self.email.to_string(),
        }
    }
}

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for the shopper id that links a browser session to its cart.
    pub const SHOPPER_ID: &str = "shopper_id";

    /// Key for the identity provider access token.
    pub const ACCESS_TOKEN: &str = "access_token";
}
