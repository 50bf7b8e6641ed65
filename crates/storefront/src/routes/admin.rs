//! Admin route handlers (require an admin profile).

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use beanvoyage_core::{Product, ProductId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Every product, including inactive ones.
#[instrument(skip_all, fields(user_id = %auth.identity.id))]
pub async fn products(State(state): State<AppState>, auth: RequireAuth) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.admin().list_products(&auth.identity).await?))
}

/// Flip a product between listed and hidden.
#[instrument(skip(state, auth), fields(user_id = %auth.identity.id))]
pub async fn toggle(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let product = state
        .admin()
        .toggle_product(&auth.identity, &ProductId::new(id))
        .await?;
    Ok(Json(product))
}

/// Delete a product.
#[instrument(skip(state, auth), fields(user_id = %auth.identity.id))]
pub async fn delete(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state
        .admin()
        .delete_product(&auth.identity, &ProductId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
