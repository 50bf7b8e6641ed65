//! Admin access management.
//!
//! The storefront never writes the `is_admin` column itself; this command is
//! the only way to set it.
//!
//! # Usage
//!
//! ```bash
//! bv-cli admin grant -e owner@beanvoyage.coffee
//! bv-cli admin revoke -e owner@beanvoyage.coffee
//! ```

use beanvoyage_core::Email;

use super::{CommandError, connect};

/// Set the admin flag on the profile with `email`.
///
/// The account must have signed in at least once so its profile exists.
///
/// # Errors
///
/// Returns an error if the email is invalid, no profile matches, or the
/// database is unreachable.
pub async fn set_admin(email: &str, is_admin: bool) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    let pool = connect().await?;

    let result = sqlx::query(
        "UPDATE profiles SET is_admin = $1, updated_at = NOW() WHERE LOWER(email) = LOWER($2)",
    )
    .bind(is_admin)
    .bind(email.as_str())
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CommandError::ProfileNotFound(email.to_string()));
    }

    tracing::info!(%email, is_admin, "Admin flag updated");
    Ok(())
}
