//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with in-memory store)
//!
//! The [`Shopper`] and [`RequireAuth`] extractors sit on top of the session.

pub mod auth;
pub mod request_id;
pub mod session;
pub mod shopper;

pub use auth::RequireAuth;
pub use request_id::{RequestId, request_id_middleware};
pub use session::create_session_layer;
pub use shopper::Shopper;
