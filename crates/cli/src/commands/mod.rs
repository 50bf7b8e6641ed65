//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by commands that talk to the database.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] beanvoyage_storefront::db::RepositoryError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] beanvoyage_core::EmailError),

    /// No profile for the given email.
    #[error("No profile found with email: {0}")]
    ProfileNotFound(String),
}

/// Database URL from `BACKEND_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// # Errors
///
/// Returns `CommandError::MissingEnvVar` if neither is set.
pub fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("BACKEND_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("BACKEND_DATABASE_URL"))
}

/// Connect using [`database_url`].
///
/// # Errors
///
/// Returns an error if the URL is missing or the connection fails.
pub async fn connect() -> Result<PgPool, CommandError> {
    let url = database_url()?;
    tracing::info!("Connecting to storefront database...");
    Ok(beanvoyage_storefront::db::create_pool(&url).await?)
}
