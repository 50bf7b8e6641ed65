//! Admin product list.
//!
//! Only identities whose profile carries `is_admin` get through. Every edit
//! refreshes the shared catalog snapshot.

use std::sync::Arc;

use thiserror::Error;

use beanvoyage_core::{Product, ProductId};

use crate::catalog::CatalogProvider;
use crate::db::{ProductRepository, RepositoryError};
use crate::models::Identity;
use crate::services::account::ProfileService;

/// Admin operation errors.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("admin access required")]
    Forbidden,

    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Product administration.
#[derive(Clone)]
pub struct AdminService {
    products: Arc<dyn ProductRepository>,
    profiles: ProfileService,
    catalog: Arc<CatalogProvider>,
}

impl AdminService {
    #[must_use]
    pub fn new(
        products: Arc<dyn ProductRepository>,
        profiles: ProfileService,
        catalog: Arc<CatalogProvider>,
    ) -> Self {
        Self {
            products,
            profiles,
            catalog,
        }
    }

    async fn authorize(&self, identity: &Identity) -> Result<(), AdminError> {
        if self.profiles.is_admin(identity).await? {
            Ok(())
        } else {
            tracing::info!(user_id = %identity.id, "Admin access denied");
            Err(AdminError::Forbidden)
        }
    }

    /// Every product, including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-admins.
    pub async fn list_products(&self, identity: &Identity) -> Result<Vec<Product>, AdminError> {
        self.authorize(identity).await?;
        Ok(self.products.list_products(true).await?)
    }

    /// Flip a product's active flag and return the updated product.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-admins and
    /// `AdminError::ProductNotFound` for unknown ids.
    pub async fn toggle_product(
        &self,
        identity: &Identity,
        id: &ProductId,
    ) -> Result<Product, AdminError> {
        self.authorize(identity).await?;
        let mut product = self
            .products
            .list_products(true)
            .await?
            .into_iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| AdminError::ProductNotFound(id.clone()))?;

        let active = !product.is_listed();
        self.products
            .set_product_active(id, active)
            .await
            .map_err(|e| not_found(e, id))?;
        product.is_active = Some(active);

        tracing::info!(user_id = %identity.id, product_id = %id, active, "Product toggled");
        self.catalog.reload().await;
        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-admins and
    /// `AdminError::ProductNotFound` for unknown ids.
    pub async fn delete_product(&self, identity: &Identity, id: &ProductId) -> Result<(), AdminError> {
        self.authorize(identity).await?;
        self.products
            .delete_product(id)
            .await
            .map_err(|e| not_found(e, id))?;

        tracing::info!(user_id = %identity.id, product_id = %id, "Product deleted");
        self.catalog.reload().await;
        Ok(())
    }
}

fn not_found(err: RepositoryError, id: &ProductId) -> AdminError {
    match err {
        RepositoryError::NotFound => AdminError::ProductNotFound(id.clone()),
        other => AdminError::Repository(other),
    }
}
