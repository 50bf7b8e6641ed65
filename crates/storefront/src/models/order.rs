//! Order domain types for the mock checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beanvoyage_core::{CartLine, Email, OrderId, OrderStatus, OrderSummary, Price, ProductId, UserId};

/// Where an order ships to.
///
/// No payment fields exist on purpose: checkout is simulated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "United States".to_owned()
}

impl ShippingDetails {
    /// Trim every field and check the required ones.
    ///
    /// # Errors
    ///
    /// Returns a user-facing message naming the first missing or invalid field.
    pub fn validated(self) -> Result<Self, String> {
        let details = Self {
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            email: self.email.trim().to_owned(),
            phone: self
                .phone
                .map(|p| p.trim().to_owned())
                .filter(|p| !p.is_empty()),
            address: self.address.trim().to_owned(),
            city: self.city.trim().to_owned(),
            state: self.state.trim().to_owned(),
            zip_code: self.zip_code.trim().to_owned(),
            country: self.country.trim().to_owned(),
        };

        let required = [
            ("First name", &details.first_name),
            ("Last name", &details.last_name),
            ("Email", &details.email),
            ("Address", &details.address),
            ("City", &details.city),
            ("State", &details.state),
            ("ZIP code", &details.zip_code),
            ("Country", &details.country),
        ];
        if let Some((label, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            return Err(format!("{label} is required"));
        }
        Email::parse(&details.email).map_err(|e| format!("Invalid email address: {e}"))?;

        Ok(details)
    }
}

/// One purchased product, priced at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: u32,
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            price: line.price,
            quantity: line.quantity,
        }
    }
}

/// An order about to be recorded.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub summary: OrderSummary,
    pub shipping: ShippingDetails,
    pub items: Vec<OrderItem>,
}

/// A recorded order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub subtotal: Price,
    pub shipping_cost: Price,
    pub tax: Price,
    pub total: Price,
    pub shipping: ShippingDetails,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Materialize a new order with status `pending`.
    #[must_use]
    pub fn from_new(order: &NewOrder, created_at: DateTime<Utc>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: OrderStatus::Pending,
            subtotal: order.summary.subtotal,
            shipping_cost: order.summary.shipping,
            tax: order.summary.tax,
            total: order.summary.total,
            shipping: order.shipping.clone(),
            items: order.items.clone(),
            created_at,
        }
    }
}
