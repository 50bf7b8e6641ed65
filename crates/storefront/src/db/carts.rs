//! Cart line persistence in `cart_items`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use beanvoyage_core::{CartLine, Price, ProductId, UserId};

use super::{CartRepository, RepositoryError, to_i32, to_u32};

/// `PostgreSQL` cart repository.
#[derive(Debug, Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    product_id: String,
    quantity: i32,
    name: String,
    price: Decimal,
    image_url: String,
    category: String,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;
        Ok(Self {
            product_id: ProductId::new(row.product_id),
            name: row.name,
            price,
            image_url: row.image_url,
            category: row.category,
            quantity: to_u32(row.quantity, "quantity")?,
        })
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    /// Display fields come from the current product row; lines whose product
    /// has been deleted are dropped by the join.
    async fn load_cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows: Vec<CartLineRow> = sqlx::query_as(
            r"
            SELECT c.product_id, c.quantity, p.name, p.price, p.image_url, p.category
            FROM cart_items c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.position, c.created_at
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    async fn replace_cart_lines(
        &self,
        user_id: UserId,
        lines: &[CartLine],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for (position, line) in lines.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| RepositoryError::Conflict("cart has too many lines".to_owned()))?;
            sqlx::query(
                r"
                INSERT INTO cart_items (user_id, product_id, quantity, position)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(user_id)
            .bind(line.product_id.as_str())
            .bind(to_i32(line.quantity, "quantity")?)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
