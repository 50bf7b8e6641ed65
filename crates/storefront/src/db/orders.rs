//! Order history in `orders` and `order_items`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use beanvoyage_core::{OrderId, OrderStatus, Price, ProductId, UserId};

use super::{OrderRepository, RepositoryError, to_i32, to_u32};
use crate::models::{NewOrder, Order, OrderItem, ShippingDetails};

/// `PostgreSQL` order repository.
#[derive(Debug, Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    status: String,
    subtotal: Decimal,
    shipping_cost: Decimal,
    tax: Decimal,
    total: Decimal,
    shipping: Json<ShippingDetails>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: String,
    name: String,
    price: Decimal,
    quantity: i32,
}

fn price(amount: Decimal, field: &str) -> Result<Price, RepositoryError> {
    Price::new(amount)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {field} in database: {e}")))
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("{e}")))?;
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            status,
            subtotal: price(self.subtotal, "subtotal")?,
            shipping_cost: price(self.shipping_cost, "shipping_cost")?,
            tax: price(self.tax, "tax")?,
            total: price(self.total, "total")?,
            shipping: self.shipping.0,
            items,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: ProductId::new(row.product_id),
            name: row.name,
            price: price(row.price, "item price")?,
            quantity: to_u32(row.quantity, "quantity")?,
        })
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r"
            INSERT INTO orders (id, user_id, status, subtotal, shipping_cost, tax, total, shipping)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING created_at
            ",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(OrderStatus::Pending.as_str())
        .bind(order.summary.subtotal.amount())
        .bind(order.summary.shipping.amount())
        .bind(order.summary.tax.amount())
        .bind(order.summary.total.amount())
        .bind(Json(&order.shipping))
        .fetch_one(&mut *tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| RepositoryError::Conflict("order has too many items".to_owned()))?;
            sqlx::query(
                r"
                INSERT INTO order_items (order_id, position, product_id, name, price, quantity)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(order.id)
            .bind(position)
            .bind(item.product_id.as_str())
            .bind(&item.name)
            .bind(item.price.amount())
            .bind(to_i32(item.quantity, "quantity")?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Order::from_new(order, created_at))
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders: Vec<OrderRow> = sqlx::query_as(
            r"
            SELECT id, user_id, status, subtotal, shipping_cost, tax, total, shipping, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let item_rows: Vec<OrderItemRow> = sqlx::query_as(
            r"
            SELECT order_id, product_id, name, price, quantity
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(ids.iter().map(OrderId::as_uuid).collect::<Vec<_>>())
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            items.entry(order_id).or_default().push(OrderItem::try_from(row)?);
        }

        orders
            .into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect()
    }
}
