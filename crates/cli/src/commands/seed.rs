//! Seed the products table with the built-in catalog.
//!
//! Existing rows with the same ids are overwritten, so re-running the seed
//! restores prices and descriptions and re-lists hidden products.

use tracing::info;

use beanvoyage_storefront::catalog::builtin_products;
use beanvoyage_storefront::db::{PgProductRepository, ProductRepository};

use super::{CommandError, connect};

/// Upsert every built-in product.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an upsert fails.
pub async fn products() -> Result<usize, CommandError> {
    let pool = connect().await?;
    let repository = PgProductRepository::new(pool);

    let products = builtin_products();
    for product in &products {
        repository.upsert_product(product).await?;
        info!(product_id = %product.id, name = %product.name, "Product seeded");
    }

    info!(count = products.len(), "Seeding complete");
    Ok(products.len())
}
