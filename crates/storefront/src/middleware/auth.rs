//! Authentication extractors.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::shopper::Shopper;
use crate::error::AppError;
use crate::models::Identity;
use crate::state::AppState;

/// Extractor that requires a signed-in shopper.
///
/// Rejects with `401 {"error": "Please sign in to continue"}` otherwise.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth { identity, .. }: RequireAuth) -> String {
///     format!("Hello, {}!", identity.display_name())
/// }
/// ```
pub struct RequireAuth {
    pub shopper: Shopper,
    pub identity: Identity,
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let shopper = Shopper::from_request_parts(parts, state).await?;
        let identity = shopper
            .gate
            .current_identity()
            .ok_or_else(|| AppError::Unauthorized("Please sign in to continue".to_string()))?;
        Ok(Self { shopper, identity })
    }
}
