//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::catalog::CatalogProvider;
use crate::config::StorefrontConfig;
use crate::db::{
    CartRepository, MemoryBackend, OrderRepository, PgCartRepository, PgOrderRepository,
    PgProductRepository, PgProfileRepository, ProductRepository, ProfileRepository,
};
use crate::services::auth::{DisabledIdentityProvider, HostedAuthClient, IdentityProvider};
use crate::services::{AdminService, CheckoutService, OrderHistory, ProfileService};
use crate::shopper::ShopperRegistry;

/// Storage and identity backends the services run against.
#[derive(Clone)]
pub struct Backends {
    pub carts: Arc<dyn CartRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub identity: Arc<dyn IdentityProvider>,
    pub persistence_enabled: bool,
    pub pool: Option<PgPool>,
}

impl Backends {
    /// `PostgreSQL` repositories and the hosted auth API.
    #[must_use]
    pub fn postgres(pool: PgPool, identity: HostedAuthClient) -> Self {
        Self {
            carts: Arc::new(PgCartRepository::new(pool.clone())),
            profiles: Arc::new(PgProfileRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            orders: Arc::new(PgOrderRepository::new(pool.clone())),
            identity: Arc::new(identity),
            persistence_enabled: true,
            pool: Some(pool),
        }
    }

    /// Every repository served by one in-memory backend.
    #[must_use]
    pub fn memory(
        backend: Arc<MemoryBackend>,
        identity: Arc<dyn IdentityProvider>,
        persistence_enabled: bool,
    ) -> Self {
        Self {
            carts: backend.clone(),
            profiles: backend.clone(),
            products: backend.clone(),
            orders: backend,
            identity,
            persistence_enabled,
            pool: None,
        }
    }

    /// No backend configured: local-only carts, built-in catalog, no sign-in.
    #[must_use]
    pub fn local() -> Self {
        Self::memory(
            Arc::new(MemoryBackend::new()),
            Arc::new(DisabledIdentityProvider),
            false,
        )
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Arc<CatalogProvider>,
    checkout: CheckoutService,
    profiles: ProfileService,
    orders: OrderHistory,
    admin: AdminService,
    shoppers: ShopperRegistry,
    pool: Option<PgPool>,
}

impl AppState {
    /// Wire the services over `backends` and load the initial catalog.
    pub async fn build(config: StorefrontConfig, backends: Backends) -> Self {
        let enabled = backends.persistence_enabled;
        let catalog = Arc::new(CatalogProvider::load(Arc::clone(&backends.products), enabled).await);
        let profiles = ProfileService::new(Arc::clone(&backends.profiles), enabled);
        let checkout =
            CheckoutService::new(Arc::clone(&backends.orders), config.checkout, enabled);
        let orders = OrderHistory::new(Arc::clone(&backends.orders), enabled);
        let admin = AdminService::new(
            Arc::clone(&backends.products),
            profiles.clone(),
            Arc::clone(&catalog),
        );
        let shoppers = ShopperRegistry::new(
            backends.carts,
            backends.profiles,
            backends.identity,
            enabled,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                checkout,
                profiles,
                orders,
                admin,
                shoppers,
                pool: backends.pool,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogProvider {
        &self.inner.catalog
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn profiles(&self) -> &ProfileService {
        &self.inner.profiles
    }

    #[must_use]
    pub fn orders(&self) -> &OrderHistory {
        &self.inner.orders
    }

    #[must_use]
    pub fn admin(&self) -> &AdminService {
        &self.inner.admin
    }

    #[must_use]
    pub fn shoppers(&self) -> &ShopperRegistry {
        &self.inner.shoppers
    }

    /// Database pool, if persistence runs on `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }
}
