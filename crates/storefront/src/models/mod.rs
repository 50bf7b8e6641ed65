//! Domain models for storefront.
//!
//! These types represent validated domain objects separate from database row types.

pub mod order;
pub mod profile;
pub mod session;

pub use order::{NewOrder, Order, OrderItem, ShippingDetails};
pub use profile::{Profile, ProfileUpdate};
pub use session::{Identity, session_keys};
