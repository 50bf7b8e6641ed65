//! Cart route handlers.
//!
//! Every mutation answers with the full cart so clients never have to
//! reconcile partial updates.

use axum::{
    Json,
    extract::State,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use beanvoyage_core::{CartLine, CartState, Price, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::Shopper;
use crate::state::AppState;

/// Cart as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total: Price,
    pub item_count: u32,
}

impl From<&CartState> for CartView {
    fn from(cart: &CartState) -> Self {
        Self {
            lines: cart.lines().to_vec(),
            total: cart.total(),
            item_count: cart.item_count(),
        }
    }
}

/// Body of `POST /cart/add` and `POST /cart/remove`.
#[derive(Debug, Deserialize)]
pub struct ProductRef {
    pub product_id: String,
}

/// Body of `POST /cart/update`.
#[derive(Debug, Deserialize)]
pub struct QuantityUpdate {
    pub product_id: String,
    pub quantity: i64,
}

/// Current cart.
pub async fn show(shopper: Shopper) -> Json<CartView> {
    Json(CartView::from(&shopper.cart.state()))
}

/// Add one unit of a catalog product.
#[instrument(skip(state, shopper), fields(shopper_id = %shopper.id))]
pub async fn add(
    State(state): State<AppState>,
    shopper: Shopper,
    Json(body): Json<ProductRef>,
) -> Result<Json<CartView>> {
    let product = state
        .catalog()
        .current()
        .by_id(&body.product_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("product {}", body.product_id)))?;
    let cart = shopper.cart.add(product);
    Ok(Json(CartView::from(&cart)))
}

/// Set a line's quantity; zero or less removes it.
#[instrument(skip(shopper), fields(shopper_id = %shopper.id))]
pub async fn update(shopper: Shopper, Json(body): Json<QuantityUpdate>) -> Json<CartView> {
    let cart = shopper
        .cart
        .set_quantity(ProductId::new(body.product_id), body.quantity);
    Json(CartView::from(&cart))
}

/// Drop a line.
#[instrument(skip(shopper), fields(shopper_id = %shopper.id))]
pub async fn remove(shopper: Shopper, Json(body): Json<ProductRef>) -> Json<CartView> {
    let cart = shopper.cart.remove(ProductId::new(body.product_id));
    Json(CartView::from(&cart))
}

/// Empty the cart.
pub async fn clear(shopper: Shopper) -> Json<CartView> {
    Json(CartView::from(&shopper.cart.clear()))
}
