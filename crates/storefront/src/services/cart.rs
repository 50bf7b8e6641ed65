//! Cart store.
//!
//! Owns one shopper's [`CartState`] and applies [`CartAction`]s through the
//! pure reducer in `beanvoyage_core`. Readers get snapshots; nobody else
//! mutates the state.
//!
//! # Persistence
//!
//! While a user id is attached and persistence is enabled, every action that
//! changes the line set (anything but `Load`) spawns a full-replace push of
//! the new lines. Pushes are fire-and-forget and numbered in the order the
//! state changed; a push never overwrites one with a higher number. Failures
//! are logged while the in-memory state stays authoritative.
//!
//! The store follows a [`SessionGate`](crate::services::SessionGate) through
//! its `watch` channel (see [`CartStore::sync_with`]). Signing in loads the
//! stored cart once, replaces the local lines with it and attaches the user
//! id in one step, so a change made while the load is in flight is either
//! replaced by the load or pushed on top of it. Signing out clears the cart
//! locally without touching storage.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::runtime::Handle;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use beanvoyage_core::{CartAction, CartLine, CartState, Product, ProductId, UserId, reduce};

use crate::db::{CartRepository, RepositoryError};
use crate::error::add_breadcrumb;
use crate::services::session::SessionState;

/// One shopper's cart.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    repository: Arc<dyn CartRepository>,
    persistence_enabled: bool,
    state: watch::Sender<CartState>,
    /// Held for reading across every state change and its push decision.
    user_id: RwLock<Option<UserId>>,
    /// Last session state the store has caught up with.
    synced: watch::Sender<SessionState>,
    push_seq: AtomicU64,
    /// Highest push sequence number written so far.
    written_seq: Mutex<u64>,
}

impl CartStore {
    /// Create an empty, anonymous cart.
    #[must_use]
    pub fn new(repository: Arc<dyn CartRepository>, persistence_enabled: bool) -> Self {
        let (state, _) = watch::channel(CartState::empty());
        Self {
            inner: Arc::new(CartInner {
                repository,
                persistence_enabled,
                state,
                user_id: RwLock::new(None),
                synced: watch::channel(SessionState::Unknown).0,
                push_seq: AtomicU64::new(0),
                written_seq: Mutex::new(0),
            }),
        }
    }

    /// Snapshot of the current cart.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// User id the cart is persisted under, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        *self
            .inner
            .user_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, product: Product) -> CartState {
        self.dispatch(CartAction::Add(product))
    }

    pub fn remove(&self, product_id: ProductId) -> CartState {
        self.dispatch(CartAction::Remove(product_id))
    }

    /// Zero or negative quantities remove the line.
    pub fn set_quantity(&self, product_id: ProductId, quantity: i64) -> CartState {
        self.dispatch(CartAction::SetQuantity {
            product_id,
            quantity,
        })
    }

    pub fn clear(&self) -> CartState {
        self.dispatch(CartAction::Clear)
    }

    /// Replace every line without pushing back to storage.
    pub fn load(&self, lines: Vec<CartLine>) -> CartState {
        self.dispatch(CartAction::Load(lines))
    }

    /// Apply `action` and return the new snapshot.
    pub fn dispatch(&self, action: CartAction) -> CartState {
        self.apply(action).0
    }

    /// Apply `action`, returning the new snapshot and the push task if one
    /// was started.
    fn apply(&self, action: CartAction) -> (CartState, Option<JoinHandle<()>>) {
        let user_id = self
            .inner
            .user_id
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        self.apply_as(*user_id, action)
    }

    /// Apply `action` on behalf of `user_id`. Callers hold the `user_id` lock.
    fn apply_as(
        &self,
        user_id: Option<UserId>,
        action: CartAction,
    ) -> (CartState, Option<JoinHandle<()>>) {
        let name = action.name();
        let persisted = action.is_persisted();

        let mut next = CartState::empty();
        let mut seq = 0;
        let changed = self.inner.state.send_if_modified(|current| {
            let reduced = reduce(current, action);
            let changed = reduced != *current;
            if changed && persisted {
                seq = self.inner.push_seq.fetch_add(1, Ordering::Relaxed) + 1;
            }
            next = reduced.clone();
            *current = reduced;
            changed
        });

        add_breadcrumb("cart", name, None);
        tracing::debug!(
            action = name,
            changed,
            lines = next.lines().len(),
            total = %next.total(),
            "Cart updated"
        );

        let push = (changed && persisted)
            .then(|| self.schedule_push(user_id?, seq, next.lines().to_vec()))
            .flatten();
        (next, push)
    }

    fn schedule_push(
        &self,
        user_id: UserId,
        seq: u64,
        lines: Vec<CartLine>,
    ) -> Option<JoinHandle<()>> {
        if !self.inner.persistence_enabled {
            return None;
        }

        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(%user_id, "Cart push skipped: no async runtime");
            return None;
        };

        let inner = Arc::clone(&self.inner);
        Some(runtime.spawn(async move {
            let mut written = inner.written_seq.lock().await;
            if *written > seq {
                tracing::debug!(%user_id, seq, "Stale cart push skipped");
                return;
            }
            match inner.repository.replace_cart_lines(user_id, &lines).await {
                Ok(()) => {
                    *written = seq;
                    tracing::debug!(%user_id, seq, lines = lines.len(), "Cart pushed");
                }
                Err(RepositoryError::MissingSchema { table }) => tracing::warn!(
                    %user_id,
                    table = %table,
                    "Cart persistence skipped: backing table missing"
                ),
                Err(e) => tracing::warn!(%user_id, error = %e, "Cart push failed"),
            }
        }))
    }

    /// React to a session transition.
    ///
    /// Becoming authenticated as a new user loads the stored cart once and
    /// attaches the id. Becoming anonymous detaches and clears locally.
    /// `Unknown` and repeated states are ignored.
    pub async fn handle_session_change(&self, session: &SessionState) {
        match session {
            SessionState::Authenticated(identity) => self.attach(identity.id).await,
            SessionState::Anonymous => {
                let mut user_id = self
                    .inner
                    .user_id
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                if user_id.take().is_some() {
                    // Detached first, so this is never pushed
                    self.apply_as(None, CartAction::Clear);
                }
            }
            SessionState::Unknown => {}
        }
        self.inner.synced.send_replace(session.clone());
    }

    /// Follow `sessions` until the sender is dropped.
    pub fn sync_with(&self, mut sessions: watch::Receiver<SessionState>) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let initial = sessions.borrow_and_update().clone();
            store.handle_session_change(&initial).await;
            while sessions.changed().await.is_ok() {
                let session = sessions.borrow_and_update().clone();
                store.handle_session_change(&session).await;
            }
        })
    }

    /// Wait until the store has handled the session state `current` reports.
    ///
    /// `current` is re-read after every handled transition, so a state that
    /// moves on while waiting is followed.
    pub async fn wait_synced(&self, current: impl Fn() -> SessionState) {
        let mut synced = self.inner.synced.subscribe();
        // The sender lives as long as `self`
        let _ = synced.wait_for(|handled| *handled == current()).await;
    }

    async fn attach(&self, user_id: UserId) {
        if self.user_id() == Some(user_id) {
            return;
        }
        let stored = self.load_remote(user_id).await;

        let mut attached = self
            .inner
            .user_id
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if *attached == Some(user_id) {
            return;
        }
        if let Some(lines) = stored {
            tracing::info!(%user_id, lines = lines.len(), "Cart loaded");
            self.apply_as(None, CartAction::Load(lines));
        }
        *attached = Some(user_id);
    }

    async fn load_remote(&self, user_id: UserId) -> Option<Vec<CartLine>> {
        if !self.inner.persistence_enabled {
            return None;
        }
        match self.inner.repository.load_cart_lines(user_id).await {
            Ok(lines) => Some(lines),
            Err(RepositoryError::MissingSchema { table }) => {
                tracing::warn!(
                    %user_id,
                    table = %table,
                    "Cart persistence skipped: backing table missing"
                );
                None
            }
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Cart load failed");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use beanvoyage_core::{Email, Price};
    use tokio::sync::Notify;

    use super::*;
    use crate::db::MemoryBackend;
    use crate::models::Identity;

    fn product(id: &str, cents: u32) -> Product {
        Product {
            id: ProductId::from(id),
            name: format!("Coffee {id}"),
            price: Price::from_cents(cents),
            image_url: format!("/images/products/{id}.jpg"),
            description: String::new(),
            category: "Medium Roast".to_owned(),
            stock_quantity: Some(10),
            is_active: Some(true),
        }
    }

    fn identity() -> Identity {
        Identity {
            id: UserId::generate(),
            email: Email::parse("ada@beanvoyage.coffee").unwrap(),
            first_name: None,
            last_name: None,
        }
    }

    fn store(backend: &Arc<MemoryBackend>, enabled: bool) -> CartStore {
        CartStore::new(backend.clone(), enabled)
    }

    fn attach_now(cart: &CartStore, user_id: UserId) {
        *cart.inner.user_id.write().unwrap() = Some(user_id);
    }

    #[tokio::test]
    async fn test_anonymous_cart_never_pushes() {
        let backend = Arc::new(MemoryBackend::new());
        let cart = store(&backend, true);
        let (state, push) = cart.apply(CartAction::Add(product("a", 1000)));
        assert!(push.is_none());
        assert_eq!(state.total(), Price::from_cents(1000));
        assert_eq!(backend.cart_write_count(), 0);
    }

    #[tokio::test]
    async fn test_authenticated_mutation_pushes_full_line_set() {
        let backend = Arc::new(MemoryBackend::new());
        let cart = store(&backend, true);
        let who = identity();
        cart.handle_session_change(&SessionState::Authenticated(who.clone()))
            .await;

        cart.add(product("a", 1000));
        let (_, push) = cart.apply(CartAction::Add(product("b", 500)));
        push.unwrap().await.unwrap();

        let stored = backend.stored_cart(who.id).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].product_id, ProductId::from("b"));
    }

    #[tokio::test]
    async fn test_load_is_not_pushed() {
        let backend = Arc::new(MemoryBackend::new());
        let cart = store(&backend, true);
        cart.handle_session_change(&SessionState::Authenticated(identity()))
            .await;
        let (_, push) = cart.apply(CartAction::Load(vec![CartLine::from_product(
            &product("a", 1000),
            3,
        )]));
        assert!(push.is_none());
    }

    #[tokio::test]
    async fn test_unchanged_state_is_not_pushed() {
        let backend = Arc::new(MemoryBackend::new());
        let cart = store(&backend, true);
        cart.handle_session_change(&SessionState::Authenticated(identity()))
            .await;
        let (_, push) = cart.apply(CartAction::Remove(ProductId::from("missing")));
        assert!(push.is_none());
    }

    #[tokio::test]
    async fn test_disabled_persistence_stays_local() {
        let backend = Arc::new(MemoryBackend::with_products(vec![product("a", 1000)]));
        let who = identity();
        backend.put_cart(who.id, vec![CartLine::from_product(&product("a", 1000), 4)]);
        let cart = store(&backend, false);

        cart.handle_session_change(&SessionState::Authenticated(who.clone()))
            .await;
        assert!(cart.state().is_empty());

        let (_, push) = cart.apply(CartAction::Add(product("a", 1000)));
        assert!(push.is_none());
        assert_eq!(backend.cart_write_count(), 0);
    }

    #[tokio::test]
    async fn test_sign_in_loads_stored_cart_once() {
        let backend = Arc::new(MemoryBackend::with_products(vec![
            product("a", 1000),
            product("b", 500),
        ]));
        let who = identity();
        backend.put_cart(who.id, vec![CartLine::from_product(&product("b", 500), 2)]);
        let cart = store(&backend, true);
        cart.add(product("a", 1000));

        let session = SessionState::Authenticated(who.clone());
        cart.handle_session_change(&session).await;
        let state = cart.state();
        assert_eq!(state.lines().len(), 1);
        assert_eq!(state.total(), Price::from_cents(1000));

        // A repeated notification for the same user does not reload
        cart.add(product("a", 1000));
        cart.handle_session_change(&session).await;
        assert_eq!(cart.state().lines().len(), 2);
    }

    #[tokio::test]
    async fn test_sign_out_clears_without_push() {
        let backend = Arc::new(MemoryBackend::new());
        let cart = store(&backend, true);
        let who = identity();
        cart.handle_session_change(&SessionState::Authenticated(who.clone()))
            .await;
        let (_, push) = cart.apply(CartAction::Add(product("a", 1000)));
        push.unwrap().await.unwrap();

        cart.handle_session_change(&SessionState::Anonymous).await;
        assert!(cart.state().is_empty());
        assert!(cart.user_id().is_none());
        assert_eq!(backend.stored_cart(who.id).unwrap().len(), 1);
        assert_eq!(backend.cart_write_count(), 1);
    }

    #[tokio::test]
    async fn test_push_failure_keeps_local_state() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_fail_writes(true);
        let cart = store(&backend, true);
        cart.handle_session_change(&SessionState::Authenticated(identity()))
            .await;

        let (state, push) = cart.apply(CartAction::Add(product("a", 1000)));
        push.unwrap().await.unwrap();
        assert_eq!(cart.state(), state);
        assert_eq!(state.item_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_push_never_overwrites_newer() {
        let backend = Arc::new(MemoryBackend::new());
        let cart = store(&backend, true);
        let who = identity();
        attach_now(&cart, who.id);

        let a = CartLine::from_product(&product("a", 1000), 1);
        let b = CartLine::from_product(&product("b", 500), 1);
        cart.schedule_push(who.id, 2, vec![a.clone(), b])
            .unwrap()
            .await
            .unwrap();
        cart.schedule_push(who.id, 1, vec![a]).unwrap().await.unwrap();

        assert_eq!(backend.stored_cart(who.id).unwrap().len(), 2);
        assert_eq!(backend.cart_write_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_schema_degrades_to_local() {
        let backend = Arc::new(MemoryBackend::new());
        backend.drop_table("cart_items");
        let cart = store(&backend, true);
        cart.handle_session_change(&SessionState::Authenticated(identity()))
            .await;

        let (_, push) = cart.apply(CartAction::Add(product("a", 1000)));
        push.unwrap().await.unwrap();
        assert_eq!(cart.state().item_count(), 1);
    }

    #[test]
    fn test_dispatch_without_runtime() {
        let backend = Arc::new(MemoryBackend::new());
        let cart = store(&backend, true);
        attach_now(&cart, UserId::generate());
        let (state, push) = cart.apply(CartAction::Add(product("a", 1000)));
        assert!(push.is_none());
        assert_eq!(state.item_count(), 1);
    }

    #[tokio::test]
    async fn test_sync_with_follows_session() {
        let backend = Arc::new(MemoryBackend::new());
        let cart = store(&backend, true);
        let (tx, rx) = watch::channel(SessionState::Unknown);
        let task = cart.sync_with(rx);

        let who = identity();
        tx.send_replace(SessionState::Authenticated(who.clone()));
        tx.send_replace(SessionState::Anonymous);
        drop(tx);
        task.await.unwrap();

        assert!(cart.user_id().is_none());
        assert!(cart.state().is_empty());
    }

    #[tokio::test]
    async fn test_wait_synced_sees_loaded_cart() {
        let backend = Arc::new(MemoryBackend::with_products(vec![product("b", 500)]));
        let who = identity();
        backend.put_cart(who.id, vec![CartLine::from_product(&product("b", 500), 2)]);
        let cart = store(&backend, true);
        let (tx, rx) = watch::channel(SessionState::Anonymous);
        let _task = cart.sync_with(rx);

        tx.send_replace(SessionState::Authenticated(who.clone()));
        cart.wait_synced(|| tx.borrow().clone()).await;
        assert_eq!(cart.user_id(), Some(who.id));
        assert_eq!(cart.state().total(), Price::from_cents(1000));
    }

    /// Reads the stored cart, then holds the answer until released.
    struct HeldLoad {
        backend: Arc<MemoryBackend>,
        started: Notify,
        release: Notify,
    }

    #[async_trait::async_trait]
    impl CartRepository for HeldLoad {
        async fn load_cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
            let lines = self.backend.load_cart_lines(user_id).await;
            self.started.notify_one();
            self.release.notified().await;
            lines
        }

        async fn replace_cart_lines(
            &self,
            user_id: UserId,
            lines: &[CartLine],
        ) -> Result<(), RepositoryError> {
            self.backend.replace_cart_lines(user_id, lines).await
        }
    }

    #[tokio::test]
    async fn test_change_during_sign_in_load_matches_storage() {
        let backend = Arc::new(MemoryBackend::with_products(vec![
            product("a", 1000),
            product("b", 500),
        ]));
        let who = identity();
        backend.put_cart(who.id, vec![CartLine::from_product(&product("b", 500), 2)]);
        let repository = Arc::new(HeldLoad {
            backend: backend.clone(),
            started: Notify::new(),
            release: Notify::new(),
        });
        let cart = CartStore::new(repository.clone(), true);

        let sign_in = tokio::spawn({
            let cart = cart.clone();
            let session = SessionState::Authenticated(who.clone());
            async move { cart.handle_session_change(&session).await }
        });
        repository.started.notified().await;

        let (_, push) = cart.apply(CartAction::Add(product("a", 1000)));
        assert!(push.is_none());
        repository.release.notify_one();
        sign_in.await.unwrap();

        assert_eq!(backend.stored_cart(who.id).unwrap(), cart.state().lines());
        assert_eq!(backend.cart_write_count(), 0);

        let (_, push) = cart.apply(CartAction::Add(product("a", 1000)));
        push.unwrap().await.unwrap();
        assert_eq!(backend.stored_cart(who.id).unwrap(), cart.state().lines());
        assert_eq!(cart.state().total(), Price::from_cents(2000));
    }
}
