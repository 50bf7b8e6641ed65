//! Account route handlers (require sign-in).

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use beanvoyage_core::OrderStatus;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Order, Profile, ProfileUpdate};
use crate::state::AppState;

/// Query parameters for order history.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    /// Status label, or `all`.
    pub status: Option<String>,
}

impl OrdersQuery {
    fn status(&self) -> Result<Option<OrderStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("" | "all" | "All") => Ok(None),
            Some(label) => label
                .parse()
                .map(Some)
                .map_err(|e| AppError::BadRequest(format!("{e}"))),
        }
    }
}

/// Saved profile, or one built from the identity.
#[instrument(skip_all, fields(user_id = %auth.identity.id))]
pub async fn profile(State(state): State<AppState>, auth: RequireAuth) -> Result<Json<Profile>> {
    Ok(Json(state.profiles().load(&auth.identity).await?))
}

/// Update contact and address fields.
#[instrument(skip_all, fields(user_id = %auth.identity.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>> {
    Ok(Json(state.profiles().save(&auth.identity, update).await?))
}

/// Order history, newest first.
#[instrument(skip_all, fields(user_id = %auth.identity.id))]
pub async fn orders(
    State(state): State<AppState>,
    auth: RequireAuth,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Vec<Order>>> {
    let status = query.status()?;
    Ok(Json(state.orders().list(&auth.identity, status).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(status: Option<&str>) -> OrdersQuery {
        OrdersQuery {
            status: status.map(String::from),
        }
    }

    #[test]
    fn test_status_filter_parsing() {
        assert_eq!(query(None).status().unwrap(), None);
        assert_eq!(query(Some("all")).status().unwrap(), None);
        assert_eq!(
            query(Some("shipped")).status().unwrap(),
            Some(OrderStatus::Shipped)
        );
        assert!(matches!(
            query(Some("lost")).status(),
            Err(AppError::BadRequest(_))
        ));
    }
}
