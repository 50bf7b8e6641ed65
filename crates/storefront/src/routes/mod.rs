//! HTTP route handlers for the storefront.
//!
//! All handlers speak JSON. Errors use `{"error": "<message>"}`.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Health check
//!
//! # Catalog
//! GET  /products?category=&q=      - Product listing (filter + search)
//! GET  /products/categories        - Category names, "All" first
//! GET  /products/{id}              - Product detail with related products
//!
//! # Cart
//! GET  /cart                       - Current cart
//! POST /cart/add                   - Add one unit {product_id}
//! POST /cart/update                - Set quantity {product_id, quantity}
//! POST /cart/remove                - Remove line {product_id}
//! POST /cart/clear                 - Empty the cart
//!
//! # Checkout
//! GET  /checkout                   - Order summary
//! POST /checkout                   - Place mock order {shipping}
//!
//! # Auth
//! POST /auth/signup                - Create account
//! POST /auth/login                 - Sign in
//! POST /auth/logout                - Sign out
//! POST /auth/reset-password        - Request recovery email
//! GET  /auth/me                    - Session state
//!
//! # Account (requires auth)
//! GET  /account/profile            - Profile
//! PUT  /account/profile            - Update profile
//! GET  /account/orders?status=     - Order history
//!
//! # Admin (requires admin profile)
//! GET    /admin/products           - All products
//! POST   /admin/products/{id}/toggle - Flip active flag
//! DELETE /admin/products/{id}      - Delete product
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod products;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/categories", get(products::categories))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/reset-password", post(auth::reset_password))
        .route("/me", get(auth::me))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(account::profile).put(account::update_profile),
        )
        .route("/orders", get(account::orders))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(admin::products))
        .route("/products/{id}/toggle", post(admin::toggle))
        .route("/products/{id}", delete(admin::delete))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route(
            "/checkout",
            get(checkout::summary).post(checkout::place_order),
        )
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .nest("/admin", admin_routes())
}
