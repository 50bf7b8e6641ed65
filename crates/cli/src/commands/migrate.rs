//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! bv-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `BACKEND_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Storefront migrations: `crates/storefront/migrations/`

use super::{CommandError, connect};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the connection or any migration fails.
pub async fn storefront() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
