//! Persistence for the storefront.
//!
//! # Database
//!
//! The hosted backend exposes a plain `PostgreSQL` database. Products are the
//! only shared data; everything else is keyed by the authenticated user id
//! issued by the identity provider.
//!
//! ## Tables
//!
//! - `profiles` - One row per user (names, address, admin flag)
//! - `products` - Catalog entries (text ids, soft-deactivated via `is_active`)
//! - `cart_items` - Persisted cart lines, fully replaced on every save
//! - `orders` / `order_items` - Mock checkout history
//!
//! # Repositories
//!
//! Callers depend on the traits in this module, held as `Arc<dyn ...>`. The
//! `Pg*` types talk to `PostgreSQL`; [`memory::MemoryBackend`] implements every
//! trait in memory for local runs and tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p beanvoyage-cli -- migrate
//! ```

pub mod carts;
pub mod memory;
pub mod orders;
pub mod products;
pub mod profiles;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use beanvoyage_core::{CartLine, Product, ProductId, UserId};

use crate::models::{NewOrder, Order, Profile};

pub use carts::PgCartRepository;
pub use memory::MemoryBackend;
pub use orders::PgOrderRepository;
pub use products::PgProductRepository;
pub use profiles::PgProfileRepository;

/// `PostgreSQL` SQLSTATE for "relation does not exist".
const UNDEFINED_TABLE: &str = "42P01";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// Data in database is invalid or corrupted.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested record was not found.
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g., unique constraint violation).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing table has not been created.
    #[error("table `{table}` does not exist")]
    MissingSchema { table: String },

    /// The store could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Returns `true` when the failure means "persistence is not set up".
    #[must_use]
    pub const fn is_missing_schema(&self) -> bool {
        matches!(self, Self::MissingSchema { .. })
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some(UNDEFINED_TABLE) {
                let table = missing_table_name(db_err.message())
                    .unwrap_or("unknown")
                    .to_owned();
                return Self::MissingSchema { table };
            }
            if db_err.is_unique_violation() {
                return Self::Conflict(db_err.message().to_owned());
            }
        }
        Self::Database(err)
    }
}

/// Extract `cart_items` from `relation "public.cart_items" does not exist`.
fn missing_table_name(message: &str) -> Option<&str> {
    let start = message.find('"')? + 1;
    let rest = message.get(start..)?;
    let quoted = rest.get(..rest.find('"')?)?;
    Some(quoted.rsplit('.').next().unwrap_or(quoted))
}

/// Loads and fully replaces a user's persisted cart lines.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Persisted lines for `user_id`, with display fields from the catalog.
    async fn load_cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError>;

    /// Delete every stored line for `user_id` and insert `lines`.
    async fn replace_cart_lines(
        &self,
        user_id: UserId,
        lines: &[CartLine],
    ) -> Result<(), RepositoryError>;
}

/// Reads and writes user profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, RepositoryError>;

    /// Insert the profile or overwrite the row with the same id.
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), RepositoryError>;
}

/// Catalog storage.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// All products ordered by name; inactive ones only when asked.
    async fn list_products(&self, include_inactive: bool) -> Result<Vec<Product>, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this id.
    async fn set_product_active(&self, id: &ProductId, active: bool)
    -> Result<(), RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this id.
    async fn delete_product(&self, id: &ProductId) -> Result<(), RepositoryError>;

    async fn upsert_product(&self, product: &Product) -> Result<(), RepositoryError>;
}

/// Order history storage.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    /// Orders for `user_id`, newest first.
    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Convert a stored integer to a non-negative count.
pub(crate) fn to_u32(value: i32, field: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {field} in database: {value}")))
}

/// Convert a count to the integer column type.
pub(crate) fn to_i32(value: u32, field: &str) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::Conflict(format!("{field} out of range: {value}")))
}
