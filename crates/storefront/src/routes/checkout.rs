//! Checkout route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use beanvoyage_core::OrderSummary;

use super::cart::CartView;
use crate::error::Result;
use crate::middleware::Shopper;
use crate::models::ShippingDetails;
use crate::services::OrderConfirmation;
use crate::state::AppState;

/// Cart plus its priced summary.
#[derive(Debug, Serialize)]
pub struct CheckoutView {
    pub cart: CartView,
    pub summary: OrderSummary,
}

/// Body of `POST /checkout`.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping: ShippingDetails,
}

/// Order summary for the current cart.
pub async fn summary(State(state): State<AppState>, shopper: Shopper) -> Json<CheckoutView> {
    let cart = shopper.cart.state();
    Json(CheckoutView {
        summary: state.checkout().summary(&cart),
        cart: CartView::from(&cart),
    })
}

/// Place a mock order and empty the cart.
#[instrument(skip_all, fields(shopper_id = %shopper.id))]
pub async fn place_order(
    State(state): State<AppState>,
    shopper: Shopper,
    Json(body): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderConfirmation>)> {
    let identity = shopper.gate.current_identity();
    let confirmation = state
        .checkout()
        .place_order(&shopper.cart, identity.as_ref(), body.shipping)
        .await?;
    Ok((StatusCode::CREATED, Json(confirmation)))
}
