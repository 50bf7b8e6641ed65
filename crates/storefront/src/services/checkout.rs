//! Mock checkout.
//!
//! Prices the cart, validates the shipping form, records an order when a
//! signed-in shopper has persistence available, then empties the cart. No
//! payment is taken and no card data is accepted.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use beanvoyage_core::{CartState, CheckoutPolicy, OrderId, OrderSummary};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::{Identity, NewOrder, OrderItem, ShippingDetails};
use crate::services::cart::CartStore;

/// Errors returned to the shopper at checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("{0}")]
    InvalidShipping(String),
}

/// What the confirmation page shows.
#[derive(Debug, Clone, Serialize)]
pub struct OrderConfirmation {
    pub order_id: OrderId,
    pub summary: OrderSummary,
    pub items: Vec<OrderItem>,
    pub shipping: ShippingDetails,
    /// Whether the order was written to order history.
    pub recorded: bool,
}

/// Checkout pricing and order placement.
#[derive(Clone)]
pub struct CheckoutService {
    orders: Arc<dyn OrderRepository>,
    policy: CheckoutPolicy,
    persistence_enabled: bool,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        policy: CheckoutPolicy,
        persistence_enabled: bool,
    ) -> Self {
        Self {
            orders,
            policy,
            persistence_enabled,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &CheckoutPolicy {
        &self.policy
    }

    /// Subtotal, shipping, tax, and total for `cart`.
    #[must_use]
    pub fn summary(&self, cart: &CartState) -> OrderSummary {
        OrderSummary::compute(cart.total(), &self.policy)
    }

    /// Place a mock order for the current contents of `cart`.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if there is nothing to buy.
    /// Returns `CheckoutError::InvalidShipping` if a required field is missing.
    /// Storage failures are logged, never returned.
    pub async fn place_order(
        &self,
        cart: &CartStore,
        identity: Option<&Identity>,
        shipping: ShippingDetails,
    ) -> Result<OrderConfirmation, CheckoutError> {
        let snapshot = cart.state();
        if snapshot.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let shipping = shipping
            .validated()
            .map_err(CheckoutError::InvalidShipping)?;

        let summary = self.summary(&snapshot);
        let items: Vec<OrderItem> = snapshot.lines().iter().map(OrderItem::from).collect();
        let order_id = OrderId::generate();

        let recorded = match identity {
            Some(identity) if self.persistence_enabled => {
                self.record(NewOrder {
                    id: order_id,
                    user_id: identity.id,
                    summary,
                    shipping: shipping.clone(),
                    items: items.clone(),
                })
                .await
            }
            _ => false,
        };

        cart.clear();
        tracing::info!(
            order_id = %order_id,
            total = %summary.total,
            recorded,
            "Order placed"
        );

        Ok(OrderConfirmation {
            order_id,
            summary,
            items,
            shipping,
            recorded,
        })
    }

    async fn record(&self, order: NewOrder) -> bool {
        match self.orders.create_order(&order).await {
            Ok(_) => true,
            Err(RepositoryError::MissingSchema { table }) => {
                tracing::warn!(table = %table, "Order history skipped: backing table missing");
                false
            }
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "Failed to record order");
                false
            }
        }
    }
}
