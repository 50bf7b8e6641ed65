//! Product catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use beanvoyage_core::Product;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// How many related products the detail view carries.
const RELATED_LIMIT: usize = 4;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub q: Option<String>,
}

/// Product detail with a few products from the same category.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub related: Vec<Product>,
}

/// List products, narrowed by category and search term.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Json<Vec<Product>> {
    let catalog = state.catalog().current();
    let products = catalog
        .filter(query.category.as_deref(), query.q.as_deref())
        .into_iter()
        .cloned()
        .collect();
    Json(products)
}

/// Category names, with "All" first.
pub async fn categories(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.catalog().current().categories())
}

/// Single product.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<ProductDetail>> {
    let catalog = state.catalog().current();
    let product = catalog
        .by_id(&id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    let related = catalog
        .related(&id, RELATED_LIMIT)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(ProductDetail { product, related }))
}
