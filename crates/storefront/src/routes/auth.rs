//! Authentication route handlers.
//!
//! Sign-in state lives in the shopper's session gate; the access token is
//! mirrored into the cookie session so it survives a rebuilt shopper
//! session. Handlers wait for the cart to follow each change before answering.

use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::Shopper;
use crate::services::SessionState;
use crate::services::auth::SignUpForm;

/// Body of `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/reset-password`.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

/// Plain acknowledgement.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

/// Create an account and, when the provider confirms immediately, sign in.
#[instrument(skip_all, fields(shopper_id = %shopper.id))]
pub async fn signup(shopper: Shopper, Json(form): Json<SignUpForm>) -> Result<Json<SessionState>> {
    shopper.gate.sign_up(form).await?;
    shopper.remember_token().await?;
    shopper.settle().await;
    Ok(Json(shopper.gate.state()))
}

/// Sign in with email and password.
#[instrument(skip_all, fields(shopper_id = %shopper.id, email = %body.email))]
pub async fn login(shopper: Shopper, Json(body): Json<LoginRequest>) -> Result<Json<SessionState>> {
    shopper.gate.sign_in(&body.email, &body.password).await?;
    shopper.remember_token().await?;
    shopper.settle().await;
    Ok(Json(shopper.gate.state()))
}

/// Sign out. Always succeeds; the cart is emptied.
#[instrument(skip_all, fields(shopper_id = %shopper.id))]
pub async fn logout(shopper: Shopper) -> Result<Json<SessionState>> {
    shopper.gate.sign_out().await;
    shopper.forget_token().await?;
    shopper.settle().await;
    Ok(Json(shopper.gate.state()))
}

/// Ask the identity provider to send a password recovery email.
#[instrument(skip_all)]
pub async fn reset_password(shopper: Shopper, Json(body): Json<ResetRequest>) -> Result<Json<Message>> {
    shopper.gate.reset_password(&body.email).await?;
    Ok(Json(Message {
        message: "If an account exists for that email, a reset link is on its way",
    }))
}

/// Current session state.
pub async fn me(shopper: Shopper) -> Json<SessionState> {
    Json(shopper.gate.state())
}
