//! Shopper sessions.
//!
//! Each browser session owns one [`SessionGate`] and one [`CartStore`]. They
//! are built lazily on the first request that carries a new shopper id and
//! kept in a `moka` cache (evicted after the same idle period as the session
//! cookie). The cart follows the gate through its subscription for as long as
//! the gate lives. When a shopper session is rebuilt, for example after a restart,
//! the access token stored in the cookie session is restored through the
//! identity provider and the persisted cart is loaded again.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::SecretString;
use uuid::Uuid;

use crate::db::{CartRepository, ProfileRepository};
use crate::services::auth::IdentityProvider;
use crate::services::{CartStore, SessionGate};

/// Idle time after which a shopper session is dropped (7 days).
pub const SHOPPER_IDLE_SECS: u64 = 7 * 24 * 60 * 60;

const MAX_SHOPPERS: u64 = 10_000;

/// One shopper's gate and cart.
pub struct ShopperSession {
    pub gate: SessionGate,
    pub cart: CartStore,
}

impl ShopperSession {
    fn new(gate: SessionGate, cart: CartStore) -> Self {
        // Ends when the gate is dropped
        drop(cart.sync_with(gate.subscribe()));
        Self { gate, cart }
    }

    /// Wait until the cart has caught up with the gate's current state.
    ///
    /// Call after anything that may have changed the session state, before
    /// reading the cart.
    pub async fn settle(&self) {
        self.cart.wait_synced(|| self.gate.state()).await;
    }
}

/// Lazily-built shopper sessions keyed by shopper id.
#[derive(Clone)]
pub struct ShopperRegistry {
    sessions: Cache<Uuid, Arc<ShopperSession>>,
    carts: Arc<dyn CartRepository>,
    profiles: Arc<dyn ProfileRepository>,
    identity: Arc<dyn IdentityProvider>,
    persistence_enabled: bool,
}

impl ShopperRegistry {
    #[must_use]
    pub fn new(
        carts: Arc<dyn CartRepository>,
        profiles: Arc<dyn ProfileRepository>,
        identity: Arc<dyn IdentityProvider>,
        persistence_enabled: bool,
    ) -> Self {
        let sessions = Cache::builder()
            .max_capacity(MAX_SHOPPERS)
            .time_to_idle(Duration::from_secs(SHOPPER_IDLE_SECS))
            .build();
        Self {
            sessions,
            carts,
            profiles,
            identity,
            persistence_enabled,
        }
    }

    /// The shopper session for `shopper_id`, built on first use.
    pub async fn get_or_create(
        &self,
        shopper_id: Uuid,
        stored_token: Option<SecretString>,
    ) -> Arc<ShopperSession> {
        self.sessions
            .get_with(shopper_id, async move {
                let gate = SessionGate::new(
                    Arc::clone(&self.identity),
                    Arc::clone(&self.profiles),
                    self.persistence_enabled,
                );
                let cart = CartStore::new(Arc::clone(&self.carts), self.persistence_enabled);
                let session = ShopperSession::new(gate, cart);

                session.gate.initialize(stored_token).await;
                session.settle().await;
                tracing::debug!(%shopper_id, "Shopper session created");
                Arc::new(session)
            })
            .await
    }

    /// Drop a shopper session.
    pub async fn remove(&self, shopper_id: Uuid) {
        self.sessions.invalidate(&shopper_id).await;
    }

    /// Approximate number of live shopper sessions.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.sessions.entry_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use beanvoyage_core::{Price, UserId};

    use super::*;
    use crate::catalog::{CatalogProvider, builtin_products};
    use crate::db::MemoryBackend;
    use crate::services::SessionState;
    use crate::services::auth::{MemoryIdentityProvider, SignUpForm};

    fn registry() -> (ShopperRegistry, Arc<MemoryBackend>, Arc<MemoryIdentityProvider>) {
        registry_over(Arc::new(MemoryBackend::with_products(builtin_products())))
    }

    fn registry_over(
        backend: Arc<MemoryBackend>,
    ) -> (ShopperRegistry, Arc<MemoryBackend>, Arc<MemoryIdentityProvider>) {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let registry =
            ShopperRegistry::new(backend.clone(), backend.clone(), provider.clone(), true);
        (registry, backend, provider)
    }

    fn form() -> SignUpForm {
        SignUpForm {
            email: "ada@beanvoyage.coffee".to_owned(),
            password: "espresso".to_owned(),
            confirm_password: "espresso".to_owned(),
            first_name: "Ada".to_owned(),
            last_name: "Byron".to_owned(),
        }
    }

    async fn wait_for_stored_lines(backend: &MemoryBackend, user_id: UserId, expected: usize) {
        for _ in 0..100 {
            if backend
                .stored_cart(user_id)
                .is_some_and(|lines| lines.len() == expected)
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("stored cart never reached {expected} lines");
    }

    #[tokio::test]
    async fn test_same_id_returns_same_session() {
        let (registry, _, _) = registry();
        let id = Uuid::new_v4();
        let first = registry.get_or_create(id, None).await;
        let second = registry.get_or_create(id, None).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.gate.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_rebuilt_session_restores_identity_and_cart() {
        let (registry, backend, provider) = registry();
        let session = provider.sign_up(&form().validate().unwrap()).await.unwrap();
        let vanilla = builtin_products().into_iter().nth(7).unwrap();
        backend.put_cart(
            session.identity.id,
            vec![beanvoyage_core::CartLine::from_product(&vanilla, 2)],
        );

        let shopper = registry
            .get_or_create(Uuid::new_v4(), session.access_token)
            .await;
        assert!(shopper.gate.state().is_authenticated());
        assert_eq!(shopper.cart.state().total(), Price::from_cents(4998));
    }

    #[tokio::test]
    async fn test_gate_changes_reach_the_cart() {
        let (registry, backend, _) = registry();
        let shopper = registry.get_or_create(Uuid::new_v4(), None).await;

        let identity = shopper.gate.sign_up(form()).await.unwrap();
        shopper.settle().await;
        assert_eq!(shopper.cart.user_id(), Some(identity.id));

        let vanilla = builtin_products().into_iter().nth(7).unwrap();
        shopper.cart.add(vanilla);
        wait_for_stored_lines(&backend, identity.id, 1).await;

        shopper.gate.sign_out().await;
        shopper.settle().await;
        assert!(shopper.cart.state().is_empty());
        assert_eq!(backend.stored_cart(identity.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cart_survives_fresh_database() {
        let backend = Arc::new(MemoryBackend::new());
        let catalog = CatalogProvider::load(backend.clone(), true).await;
        let (registry, backend, provider) = registry_over(backend);

        let session = provider.sign_up(&form().validate().unwrap()).await.unwrap();
        let first = registry
            .get_or_create(Uuid::new_v4(), session.access_token.clone())
            .await;
        let vanilla = catalog.current().by_id("8").unwrap().clone();
        first.cart.add(vanilla);
        wait_for_stored_lines(&backend, session.identity.id, 1).await;

        let second = registry
            .get_or_create(Uuid::new_v4(), session.access_token)
            .await;
        assert_eq!(second.cart.state().lines().len(), 1);
        assert_eq!(second.cart.state().total(), Price::from_cents(2499));
    }
}
