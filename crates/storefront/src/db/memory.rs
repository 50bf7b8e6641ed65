//! In-memory implementation of every repository trait.
//!
//! Used when the backend is not configured and by tests. Failures can be
//! injected to exercise the degraded paths: [`MemoryBackend::set_fail_writes`]
//! makes every write return `Unavailable`, and [`MemoryBackend::drop_table`]
//! makes every access to one table return `MissingSchema`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use beanvoyage_core::{CartLine, Product, ProductId, UserId};

use super::{
    CartRepository, OrderRepository, ProductRepository, ProfileRepository, RepositoryError,
};
use crate::models::{NewOrder, Order, Profile};

/// Every storefront table held in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    carts: Mutex<HashMap<UserId, Vec<CartLine>>>,
    profiles: Mutex<HashMap<UserId, Profile>>,
    products: Mutex<Vec<Product>>,
    orders: Mutex<Vec<Order>>,
    missing_tables: Mutex<HashSet<String>>,
    fail_writes: AtomicBool,
    cart_writes: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryBackend {
    /// An empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose `products` table holds `products`.
    #[must_use]
    pub fn with_products(products: Vec<Product>) -> Self {
        let backend = Self::default();
        *lock(&backend.products) = products;
        backend
    }

    /// Make every subsequent write fail with `Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every access to `table` fail with `MissingSchema`.
    pub fn drop_table(&self, table: &str) {
        lock(&self.missing_tables).insert(table.to_owned());
    }

    /// Stored cart lines for `user_id`, bypassing failure injection.
    #[must_use]
    pub fn stored_cart(&self, user_id: UserId) -> Option<Vec<CartLine>> {
        lock(&self.carts).get(&user_id).cloned()
    }

    /// Stored profile for `user_id`, bypassing failure injection.
    #[must_use]
    pub fn stored_profile(&self, user_id: UserId) -> Option<Profile> {
        lock(&self.profiles).get(&user_id).cloned()
    }

    /// Number of successful cart replacements so far.
    #[must_use]
    pub fn cart_write_count(&self) -> usize {
        self.cart_writes.load(Ordering::SeqCst)
    }

    /// Seed a stored cart directly.
    pub fn put_cart(&self, user_id: UserId, lines: Vec<CartLine>) {
        lock(&self.carts).insert(user_id, lines);
    }

    /// Seed a profile directly, e.g. one with the admin flag set.
    pub fn put_profile(&self, profile: Profile) {
        lock(&self.profiles).insert(profile.id, profile);
    }

    fn check_table(&self, table: &str) -> Result<(), RepositoryError> {
        if lock(&self.missing_tables).contains(table) {
            return Err(RepositoryError::MissingSchema {
                table: table.to_owned(),
            });
        }
        Ok(())
    }

    fn check_write(&self, table: &str) -> Result<(), RepositoryError> {
        self.check_table(table)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(format!(
                "writes to {table} are failing"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CartRepository for MemoryBackend {
    async fn load_cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        self.check_table("cart_items")?;
        let stored = lock(&self.carts).get(&user_id).cloned().unwrap_or_default();
        let products = lock(&self.products);

        // Same shape as the SQL join: current display fields, deleted products dropped.
        Ok(stored
            .into_iter()
            .filter_map(|line| {
                products
                    .iter()
                    .find(|p| p.id == line.product_id)
                    .map(|product| CartLine::from_product(product, line.quantity))
            })
            .collect())
    }

    async fn replace_cart_lines(
        &self,
        user_id: UserId,
        lines: &[CartLine],
    ) -> Result<(), RepositoryError> {
        self.check_write("cart_items")?;
        lock(&self.carts).insert(user_id, lines.to_vec());
        self.cart_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for MemoryBackend {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, RepositoryError> {
        self.check_table("profiles")?;
        Ok(lock(&self.profiles).get(&user_id).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), RepositoryError> {
        self.check_write("profiles")?;
        let mut profiles = lock(&self.profiles);
        let is_admin = profiles.get(&profile.id).is_some_and(|p| p.is_admin);
        profiles.insert(
            profile.id,
            Profile {
                is_admin,
                ..profile.clone()
            },
        );
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for MemoryBackend {
    async fn list_products(&self, include_inactive: bool) -> Result<Vec<Product>, RepositoryError> {
        self.check_table("products")?;
        let mut products: Vec<Product> = lock(&self.products)
            .iter()
            .filter(|p| include_inactive || p.is_listed())
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn set_product_active(
        &self,
        id: &ProductId,
        active: bool,
    ) -> Result<(), RepositoryError> {
        self.check_write("products")?;
        let mut products = lock(&self.products);
        let product = products
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or(RepositoryError::NotFound)?;
        product.is_active = Some(active);
        Ok(())
    }

    async fn delete_product(&self, id: &ProductId) -> Result<(), RepositoryError> {
        self.check_write("products")?;
        let mut products = lock(&self.products);
        let before = products.len();
        products.retain(|p| &p.id != id);
        if products.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), RepositoryError> {
        self.check_write("products")?;
        let mut products = lock(&self.products);
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product.clone(),
            None => products.push(product.clone()),
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryBackend {
    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        self.check_write("orders")?;
        let created = Order::from_new(order, Utc::now());
        lock(&self.orders).push(created.clone());
        Ok(created)
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.check_table("orders")?;
        let mut orders: Vec<Order> = lock(&self.orders)
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}
