//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Backend (all three required to enable persistence)
//! - `BACKEND_URL` - Hosted backend base URL (auth API served under `/auth/v1`)
//! - `BACKEND_ANON_KEY` - Public API key sent with every auth request
//! - `BACKEND_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL (default: `http://localhost:3000`)
//! - `CHECKOUT_TAX_RATE` - Flat tax rate (default: 0.08)
//! - `CHECKOUT_FREE_SHIPPING_THRESHOLD` - Free shipping above this subtotal (default: 50.00)
//! - `CHECKOUT_FLAT_SHIPPING` - Shipping fee below the threshold (default: 5.99)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! # Persistence flag
//!
//! Whether the storefront talks to the backend at all is decided exactly once,
//! here. A missing or placeholder backend setting disables persistence for
//! the whole process: the catalog falls back to the built-in products, carts
//! stay in memory, and sign-in reports that authentication is not configured.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use beanvoyage_core::{CheckoutPolicy, Price};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Blocklist of common placeholder patterns (case-insensitive).
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-project",
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Hosted backend settings; `None` means persistence is disabled
    pub backend: Option<BackendConfig>,
    /// Shipping and tax rules
    pub checkout: CheckoutPolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Hosted backend configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL of the hosted backend
    pub url: Url,
    /// Public API key for the auth endpoints
    pub anon_key: SecretString,
    /// `PostgreSQL` connection string (contains password)
    pub database_url: SecretString,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("database_url", &"[REDACTED]")
            .finish()
    }
}

impl BackendConfig {
    /// Base URL of the hosted auth API (`{url}/auth/v1/`).
    #[must_use]
    pub fn auth_url(&self) -> Url {
        let mut url = self.url.clone();
        let path = format!("{}/auth/v1/", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url
    }
}

/// Outcome of resolving the backend settings.
#[derive(Debug)]
enum BackendResolution {
    Enabled(BackendConfig),
    Disabled(String),
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an optional variable is set but malformed.
    /// Missing or placeholder backend settings are not errors; they disable
    /// persistence and are logged.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value is present but cannot be parsed.
    pub fn from_source<F>(source: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = parse_or_default::<IpAddr, _>(&source, "STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_or_default::<u16, _>(&source, "STOREFRONT_PORT", "3000")?;
        let base_url = source("STOREFRONT_BASE_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string());

        let backend = match resolve_backend(&source)? {
            BackendResolution::Enabled(backend) => {
                tracing::info!(url = %backend.url, "Backend persistence enabled");
                Some(backend)
            }
            BackendResolution::Disabled(reason) => {
                tracing::warn!(
                    reason = %reason,
                    "Backend persistence disabled; running with local-only carts and built-in catalog"
                );
                None
            }
        };

        let checkout = CheckoutPolicy {
            tax_rate: parse_or_default::<Decimal, _>(&source, "CHECKOUT_TAX_RATE", "0.08")?,
            free_shipping_threshold: parse_price(
                &source,
                "CHECKOUT_FREE_SHIPPING_THRESHOLD",
                "50.00",
            )?,
            flat_shipping: parse_price(&source, "CHECKOUT_FLAT_SHIPPING", "5.99")?,
        };
        if checkout.tax_rate.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "CHECKOUT_TAX_RATE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            base_url,
            backend,
            checkout,
            sentry_dsn: source("SENTRY_DSN").filter(|v| !v.is_empty()),
            sentry_environment: source("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_or_default::<f32, _>(&source, "SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_or_default::<f32, _>(
                &source,
                "SENTRY_TRACES_SAMPLE_RATE",
                "0.1",
            )?,
        })
    }

    /// Whether the storefront persists carts, profiles, and orders.
    ///
    /// Resolved once when the configuration is loaded.
    #[must_use]
    pub const fn persistence_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Configuration for tests and local runs without a backend.
    #[must_use]
    pub fn local() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            backend: None,
            checkout: CheckoutPolicy::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Resolve the backend settings into an enabled config or a reason it is off.
fn resolve_backend<F>(source: &F) -> Result<BackendResolution, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw_url) = source("BACKEND_URL").filter(|v| !v.trim().is_empty()) else {
        return Ok(BackendResolution::Disabled("BACKEND_URL is not set".to_string()));
    };
    if let Some(pattern) = placeholder_pattern(&raw_url) {
        return Ok(BackendResolution::Disabled(format!(
            "BACKEND_URL looks like a placeholder (contains '{pattern}')"
        )));
    }
    let url = Url::parse(raw_url.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_URL".to_string(), e.to_string()))?;

    let Some(anon_key) = source("BACKEND_ANON_KEY").filter(|v| !v.trim().is_empty()) else {
        return Ok(BackendResolution::Disabled(
            "BACKEND_ANON_KEY is not set".to_string(),
        ));
    };
    if let Some(pattern) = placeholder_pattern(&anon_key) {
        return Ok(BackendResolution::Disabled(format!(
            "BACKEND_ANON_KEY looks like a placeholder (contains '{pattern}')"
        )));
    }

    // Fallback to generic DATABASE_URL (set by most Postgres hosting add-ons)
    let Some(database_url) = source("BACKEND_DATABASE_URL")
        .or_else(|| source("DATABASE_URL"))
        .filter(|v| !v.trim().is_empty())
    else {
        return Ok(BackendResolution::Disabled(
            "BACKEND_DATABASE_URL is not set".to_string(),
        ));
    };
    let database_url = SecretString::from(database_url);
    if let Some(pattern) = placeholder_pattern(database_url.expose_secret()) {
        return Ok(BackendResolution::Disabled(format!(
            "BACKEND_DATABASE_URL looks like a placeholder (contains '{pattern}')"
        )));
    }

    Ok(BackendResolution::Enabled(BackendConfig {
        url,
        anon_key: SecretString::from(anon_key),
        database_url,
    }))
}

/// Returns the first placeholder pattern found in `value`, if any.
fn placeholder_pattern(value: &str) -> Option<&'static str> {
    let lower = value.to_lowercase();
    PLACEHOLDER_PATTERNS
        .iter()
        .copied()
        .find(|pattern| lower.contains(pattern))
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or_default<T, F>(source: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = source(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_price<F>(source: &F, key: &str, default: &str) -> Result<Price, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or_default::<Price, _>(source, key, default)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_source(|key| map.get(key).cloned())
    }

    const BACKEND: &[(&str, &str)] = &[
        ("BACKEND_URL", "https://qzkfhwtplm.hosted-backend.co"),
        ("BACKEND_ANON_KEY", "eyJhbGciOiJIUzI1NiJ9.c2VydmljZQ.k3Yz"),
        ("BACKEND_DATABASE_URL", "postgres://app:pw@db.internal:5432/beanvoyage"),
    ];

    #[test]
    fn test_defaults_without_backend() {
        let config = load(&[]).unwrap();
        assert!(!config.persistence_enabled());
        assert_eq!(config.socket_addr().port(), 3000);
        assert_eq!(config.checkout, CheckoutPolicy::default());
    }

    #[test]
    fn test_backend_enabled_when_fully_configured() {
        let config = load(BACKEND).unwrap();
        assert!(config.persistence_enabled());
    }

    #[test]
    fn test_placeholder_url_disables_persistence() {
        let config = load(&[
            ("BACKEND_URL", "https://your-project.supabase.co"),
            ("BACKEND_ANON_KEY", "eyJhbGciOiJIUzI1NiJ9.c2VydmljZQ.k3Yz"),
            ("BACKEND_DATABASE_URL", "postgres://app:pw@db.internal/bv"),
        ])
        .unwrap();
        assert!(!config.persistence_enabled());
    }

    #[test]
    fn test_missing_database_url_disables_persistence() {
        let config = load(&BACKEND[..2]).unwrap();
        assert!(!config.persistence_enabled());
    }

    #[test]
    fn test_generic_database_url_fallback() {
        let mut pairs = BACKEND[..2].to_vec();
        pairs.push(("DATABASE_URL", "postgres://app:pw@db.internal/bv"));
        assert!(load(&pairs).unwrap().persistence_enabled());
    }

    #[test]
    fn test_invalid_port_is_error() {
        let err = load(&[("STOREFRONT_PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "STOREFRONT_PORT"));
    }

    #[test]
    fn test_checkout_overrides() {
        let config = load(&[
            ("CHECKOUT_TAX_RATE", "0.1"),
            ("CHECKOUT_FREE_SHIPPING_THRESHOLD", "75"),
            ("CHECKOUT_FLAT_SHIPPING", "$4.50"),
        ])
        .unwrap();
        assert_eq!(config.checkout.tax_rate, Decimal::new(1, 1));
        assert_eq!(config.checkout.free_shipping_threshold, Price::from_cents(7500));
        assert_eq!(config.checkout.flat_shipping, Price::from_cents(450));
    }

    #[test]
    fn test_negative_tax_rate_rejected() {
        assert!(load(&[("CHECKOUT_TAX_RATE", "-0.05")]).is_err());
    }

    #[test]
    fn test_auth_url_appends_path() {
        let config = load(BACKEND).unwrap();
        let backend = config.backend.unwrap();
        assert_eq!(
            backend.auth_url().as_str(),
            "https://qzkfhwtplm.hosted-backend.co/auth/v1/"
        );
    }

    #[test]
    fn test_backend_debug_redacts_secrets() {
        let config = load(BACKEND).unwrap();
        let debug_output = format!("{:?}", config.backend.unwrap());
        assert!(debug_output.contains("hosted-backend.co"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("eyJhbGciOiJIUzI1NiJ9"));
        assert!(!debug_output.contains("app:pw"));
    }
}
