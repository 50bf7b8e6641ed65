//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Identity provider clients and sign-up validation
//! - `session` - Per-shopper session gate
//! - `cart` - Per-shopper cart store with remote sync
//! - `checkout` - Order summary and mock order placement
//! - `account` - Profile and order history
//! - `admin` - Product administration

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod session;

pub use account::{OrderHistory, ProfileService};
pub use admin::{AdminError, AdminService};
pub use cart::CartStore;
pub use checkout::{CheckoutError, CheckoutService, OrderConfirmation};
pub use session::{SessionGate, SessionState};
