//! Catalog persistence in `products`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use beanvoyage_core::{Price, Product, ProductId};

use super::{ProductRepository, RepositoryError, to_i32, to_u32};

/// `PostgreSQL` product repository.
#[derive(Debug, Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    price: Decimal,
    image_url: String,
    description: String,
    category: String,
    stock_quantity: Option<i32>,
    is_active: bool,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;
        let stock_quantity = row
            .stock_quantity
            .map(|q| to_u32(q, "stock_quantity"))
            .transpose()?;
        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            price,
            image_url: row.image_url,
            description: row.description,
            category: row.category,
            stock_quantity,
            is_active: Some(row.is_active),
        })
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn list_products(&self, include_inactive: bool) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            r"
            SELECT id, name, price, image_url, description, category, stock_quantity, is_active
            FROM products
            WHERE is_active OR $1
            ORDER BY name
            ",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn set_product_active(
        &self,
        id: &ProductId,
        active: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET is_active = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_str())
        .bind(active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_product(&self, id: &ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let stock_quantity = product
            .stock_quantity
            .map(|q| to_i32(q, "stock_quantity"))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO products (id, name, price, image_url, description, category,
                                  stock_quantity, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                image_url = EXCLUDED.image_url,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                stock_quantity = EXCLUDED.stock_quantity,
                is_active = EXCLUDED.is_active,
                updated_at = now()
            ",
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(product.price.amount())
        .bind(&product.image_url)
        .bind(&product.description)
        .bind(&product.category)
        .bind(stock_quantity)
        .bind(product.is_active.unwrap_or(true))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
