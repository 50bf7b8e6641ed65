//! Catalog provider.
//!
//! Holds the current [`Catalog`] snapshot behind a lock so admin edits can
//! swap it without blocking readers for long. The snapshot comes from the
//! `products` table when persistence is enabled, and from the built-in
//! product list otherwise or whenever the table is unreadable.
//!
//! An empty `products` table found at startup is seeded with the built-in
//! list, so every product a shopper can add also exists for stored cart lines
//! to reference. A table emptied later by admin deletes stays empty.

use std::sync::{Arc, PoisonError, RwLock};

use beanvoyage_core::{Catalog, Price, Product, ProductId};

use crate::db::{ProductRepository, RepositoryError};

/// Shared, swappable catalog snapshot.
pub struct CatalogProvider {
    repository: Arc<dyn ProductRepository>,
    persistence_enabled: bool,
    current: RwLock<Arc<Catalog>>,
}

impl CatalogProvider {
    /// Load the initial snapshot.
    pub async fn load(repository: Arc<dyn ProductRepository>, persistence_enabled: bool) -> Self {
        let catalog = fetch(repository.as_ref(), persistence_enabled, true).await;
        Self {
            repository,
            persistence_enabled,
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<Catalog> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Re-read the catalog after an admin edit.
    pub async fn reload(&self) {
        let catalog =
            Arc::new(fetch(self.repository.as_ref(), self.persistence_enabled, false).await);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = catalog;
    }
}

async fn fetch(
    repository: &dyn ProductRepository,
    persistence_enabled: bool,
    seed_if_empty: bool,
) -> Catalog {
    if !persistence_enabled {
        return Catalog::new(builtin_products());
    }
    match repository.list_products(false).await {
        Ok(products) if !products.is_empty() => {
            tracing::info!(count = products.len(), "Catalog loaded from database");
            Catalog::new(products)
        }
        Ok(products) if !seed_if_empty => Catalog::new(products),
        Ok(_) => match repository.list_products(true).await {
            // Only inactive rows; an admin hid everything
            Ok(hidden) if !hidden.is_empty() => Catalog::new(Vec::new()),
            _ => {
                let products = builtin_products();
                seed(repository, &products).await;
                Catalog::new(products)
            }
        },
        Err(RepositoryError::MissingSchema { table }) => {
            tracing::warn!(table = %table, "Catalog table missing, using built-in catalog");
            Catalog::new(builtin_products())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load catalog, using built-in catalog");
            Catalog::new(builtin_products())
        }
    }
}

async fn seed(repository: &dyn ProductRepository, products: &[Product]) {
    for product in products {
        if let Err(e) = repository.upsert_product(product).await {
            tracing::warn!(
                product_id = %product.id,
                error = %e,
                "Failed to seed built-in product"
            );
            return;
        }
    }
    tracing::info!(count = products.len(), "Seeded empty catalog with built-in products");
}

/// The eight coffees the shop launched with.
#[must_use]
pub fn builtin_products() -> Vec<Product> {
    let product = |id: &str,
                   name: &str,
                   cents: u32,
                   image: &str,
                   description: &str,
                   category: &str,
                   stock: u32| Product {
        id: ProductId::from(id),
        name: name.to_owned(),
        price: Price::from_cents(cents),
        image_url: format!("/images/products/{image}"),
        description: description.to_owned(),
        category: category.to_owned(),
        stock_quantity: Some(stock),
        is_active: Some(true),
    };

    vec![
        product(
            "1",
            "Caramel Coffee",
            2499,
            "Caramal.jpg",
            "Rich and smooth coffee with delicious caramel notes. Perfect for those who love sweet, indulgent flavors.",
            "Flavored",
            50,
        ),
        product(
            "2",
            "Cinnamon Spice",
            2299,
            "Cinnamon.jpg",
            "Warm and aromatic coffee infused with natural cinnamon spice. A perfect morning pick-me-up.",
            "Flavored",
            45,
        ),
        product(
            "3",
            "Dark Roast",
            2199,
            "Dark_roast.jpg",
            "Bold and intense dark roasted coffee with a rich, smoky flavor and minimal acidity.",
            "Dark Roast",
            60,
        ),
        product(
            "4",
            "Espresso Blend",
            2599,
            "Espresso_blend.jpg",
            "Specially crafted espresso blend with rich crema and balanced flavor profile. Perfect for espresso lovers.",
            "Espresso",
            40,
        ),
        product(
            "5",
            "Hazelnut Coffee",
            2399,
            "Hazelnut.jpg",
            "Smooth coffee with rich hazelnut flavor. A nutty and aromatic experience in every cup.",
            "Flavored",
            35,
        ),
        product(
            "6",
            "Light Roast",
            2099,
            "Light_roast.jpg",
            "Bright and crisp light roast with floral notes and natural sweetness. Perfect for morning brewing.",
            "Light Roast",
            55,
        ),
        product(
            "7",
            "Medium Roast",
            2299,
            "Medium_roast.jpg",
            "Well-balanced medium roast with perfect harmony of flavor and aroma. Our most popular choice.",
            "Medium Roast",
            70,
        ),
        product(
            "8",
            "Vanilla Coffee",
            2499,
            "Vanilla.jpg",
            "Smooth and creamy coffee with natural vanilla flavoring. A sweet and aromatic delight.",
            "Flavored",
            42,
        ),
    ]
}
