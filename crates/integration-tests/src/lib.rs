//! Integration tests for the BeanVoyage storefront.
//!
//! Each test starts the full router on an ephemeral port, backed by the
//! in-memory repositories and identity provider, and talks to it over HTTP
//! with a cookie-keeping `reqwest` client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p beanvoyage-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};

use beanvoyage_core::{CartLine, UserId};
use beanvoyage_storefront::catalog::builtin_products;
use beanvoyage_storefront::config::StorefrontConfig;
use beanvoyage_storefront::db::MemoryBackend;
use beanvoyage_storefront::services::auth::{DisabledIdentityProvider, MemoryIdentityProvider};
use beanvoyage_storefront::state::{AppState, Backends};

/// A running storefront plus handles on its backends.
pub struct TestContext {
    pub base_url: String,
    pub backend: Arc<MemoryBackend>,
    pub identity: Arc<MemoryIdentityProvider>,
}

impl TestContext {
    /// Storefront with persistence and sign-in available.
    pub async fn new() -> Self {
        let backend = Arc::new(MemoryBackend::with_products(builtin_products()));
        let identity = Arc::new(MemoryIdentityProvider::new());
        let backends = Backends::memory(backend.clone(), identity.clone(), true);
        let base_url = serve(backends).await;
        Self {
            base_url,
            backend,
            identity,
        }
    }

    /// Storefront with persistence on over an empty database, as right
    /// after migrations.
    pub async fn fresh_database() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let identity = Arc::new(MemoryIdentityProvider::new());
        let backends = Backends::memory(backend.clone(), identity.clone(), true);
        let base_url = serve(backends).await;
        Self {
            base_url,
            backend,
            identity,
        }
    }

    /// Storefront started without backend settings.
    pub async fn local_only() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let backends = Backends::memory(
            backend.clone(),
            Arc::new(DisabledIdentityProvider),
            false,
        );
        let base_url = serve(backends).await;
        Self {
            base_url,
            backend,
            identity: Arc::new(MemoryIdentityProvider::new()),
        }
    }

    /// A fresh browser: its own cookie jar, so its own shopper session.
    pub fn browser(&self) -> Browser {
        Browser {
            client: Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: self.base_url.clone(),
        }
    }

    /// Wait until the stored cart for `user_id` has `expected` lines.
    ///
    /// Cart pushes run in the background after each mutation.
    pub async fn wait_for_stored_cart(&self, user_id: UserId, expected: usize) -> Vec<CartLine> {
        for _ in 0..100 {
            if let Some(lines) = self.backend.stored_cart(user_id)
                && lines.len() == expected
            {
                return lines;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("stored cart for {user_id} never reached {expected} lines");
    }
}

async fn serve(backends: Backends) -> String {
    let state = AppState::build(StorefrontConfig::local(), backends).await;
    let app = beanvoyage_storefront::app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// HTTP client bound to one cookie session.
pub struct Browser {
    pub client: Client,
    pub base_url: String,
}

impl Browser {
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    pub async fn put(&self, path: &str, body: &Value) -> Response {
        self.client
            .put(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(format!("{}{path}", self.base_url))
            .send()
            .await
            .unwrap()
    }

    /// GET and decode, asserting 200.
    pub async fn get_json(&self, path: &str) -> Value {
        let resp = self.get(path).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
        resp.json().await.unwrap()
    }

    /// POST and decode, asserting `status`.
    pub async fn post_json(&self, path: &str, body: &Value, status: StatusCode) -> Value {
        let resp = self.post(path, body).await;
        assert_eq!(resp.status(), status, "POST {path}");
        resp.json().await.unwrap()
    }

    pub async fn add_to_cart(&self, product_id: &str) -> Value {
        self.post_json("/cart/add", &json!({ "product_id": product_id }), StatusCode::OK)
            .await
    }

    /// Sign up with a standard password and return the session state.
    pub async fn sign_up(&self, email: &str) -> Value {
        self.post_json(
            "/auth/signup",
            &json!({
                "email": email,
                "password": "espresso",
                "confirm_password": "espresso",
                "first_name": "Ada",
                "last_name": "Byron",
            }),
            StatusCode::OK,
        )
        .await
    }

    pub async fn log_in(&self, email: &str, password: &str) -> Response {
        self.post(
            "/auth/login",
            &json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn log_out(&self) -> Value {
        self.post_json("/auth/logout", &json!({}), StatusCode::OK)
            .await
    }
}

/// Shipping form with every required field filled in.
#[must_use]
pub fn shipping() -> Value {
    json!({
        "first_name": "Ada",
        "last_name": "Byron",
        "email": "ada@beanvoyage.coffee",
        "address": "12 Roastery Lane",
        "city": "Portland",
        "state": "OR",
        "zip_code": "97201"
    })
}

/// The user id inside a session-state response.
#[must_use]
pub fn user_id(session: &Value) -> UserId {
    serde_json::from_value(session["identity"]["id"].clone()).unwrap()
}

/// A price field as dollars.
#[must_use]
pub fn money(value: &Value) -> f64 {
    value.as_str().unwrap().parse().unwrap()
}
