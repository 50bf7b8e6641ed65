//! BeanVoyage Core - Shared types and cart logic.
//!
//! This crate provides the pieces of the storefront that do no I/O:
//! - typed ids, prices, emails, and order status labels
//! - the product catalog and its browse/search queries
//! - the shopping cart state and its pure transition function
//! - checkout arithmetic (shipping, flat tax, totals)
//!
//! # Architecture
//!
//! Everything here is synchronous and deterministic. Persistence, identity,
//! and HTTP live in the `storefront` crate, which drives these types.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails, and statuses
//! - [`catalog`] - Product records and read-only catalog queries
//! - [`cart`] - Cart lines, cart state, and the reducer
//! - [`checkout`] - Order summary computation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod types;

pub use cart::{CartAction, CartLine, CartState, reduce};
pub use catalog::{ALL_CATEGORIES, Catalog, Product};
pub use checkout::{CheckoutPolicy, OrderSummary};
pub use types::*;
