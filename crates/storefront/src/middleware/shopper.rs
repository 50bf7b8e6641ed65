//! Shopper extractor.
//!
//! Resolves the cookie session to the shopper's [`ShopperSession`], assigning
//! a fresh shopper id on first contact.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use secrecy::{ExposeSecret, SecretString};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::session_keys;
use crate::shopper::ShopperSession;
use crate::state::AppState;

/// The current shopper's gate and cart, plus the cookie session they hang off.
pub struct Shopper {
    pub id: Uuid,
    pub session: Session,
    pub inner: Arc<ShopperSession>,
}

impl std::ops::Deref for Shopper {
    type Target = ShopperSession;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Shopper {
    /// Persist the gate's current access token into the cookie session so a
    /// rebuilt shopper session can restore the sign-in.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn remember_token(&self) -> Result<(), AppError> {
        match self.inner.gate.access_token() {
            Some(token) => self
                .session
                .insert(session_keys::ACCESS_TOKEN, token.expose_secret())
                .await
                .map_err(session_error),
            None => self.forget_token().await,
        }
    }

    /// Remove the access token from the cookie session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn forget_token(&self) -> Result<(), AppError> {
        self.session
            .remove::<String>(session_keys::ACCESS_TOKEN)
            .await
            .map(|_| ())
            .map_err(session_error)
    }
}

impl FromRequestParts<AppState> for Shopper {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(msg.to_string()))?;

        let id = match session
            .get::<Uuid>(session_keys::SHOPPER_ID)
            .await
            .map_err(session_error)?
        {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                session
                    .insert(session_keys::SHOPPER_ID, id)
                    .await
                    .map_err(session_error)?;
                id
            }
        };

        let stored_token = session
            .get::<String>(session_keys::ACCESS_TOKEN)
            .await
            .map_err(session_error)?
            .map(SecretString::from);

        let inner = state.shoppers().get_or_create(id, stored_token).await;
        Ok(Self { id, session, inner })
    }
}

fn session_error(err: tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session store: {err}"))
}
