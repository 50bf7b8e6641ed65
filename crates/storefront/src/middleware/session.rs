//! Session middleware configuration.
//!
//! Cookie sessions via tower-sessions with an in-memory store. The cookie
//! session only carries the shopper id and the identity provider's access
//! token; carts live in the shopper registry and, when enabled, the database.

use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::StorefrontConfig;
use crate::shopper::SHOPPER_IDLE_SECS;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bv_session";

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    let idle_secs = i64::try_from(SHOPPER_IDLE_SECS).unwrap_or(i64::MAX);

    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(idle_secs),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
