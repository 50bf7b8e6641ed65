//! Session/identity gate.
//!
//! Wraps the identity provider's session lifecycle and publishes the current
//! [`SessionState`] on a `watch` channel. The cart store subscribes to it to
//! decide whether, and under which user id, carts are persisted.
//!
//! ```text
//! Unknown ──initialize──▶ Anonymous ◀──sign_out── Authenticated(identity)
//!    │                        │                          ▲
//!    └──initialize (token)────┴──sign_in / sign_up───────┘
//! ```
//!
//! A failed sign-in or sign-up leaves the state untouched.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use secrecy::SecretString;
use serde::Serialize;
use tokio::sync::watch;

use beanvoyage_core::Email;

use crate::db::ProfileRepository;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{Identity, Profile};
use crate::services::auth::{AuthError, AuthSession, IdentityProvider, SignUpForm};

/// Where the shopper stands with the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "identity", rename_all = "snake_case")]
pub enum SessionState {
    /// The provider has not answered yet.
    #[default]
    Unknown,
    Anonymous,
    Authenticated(Identity),
}

impl SessionState {
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Unknown | Self::Anonymous => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Tracks one shopper's authentication state.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileRepository>,
    persistence_enabled: bool,
    state: watch::Sender<SessionState>,
    access_token: Mutex<Option<SecretString>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionGate {
    /// Create a gate in the `Unknown` state.
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileRepository>,
        persistence_enabled: bool,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            inner: Arc::new(GateInner {
                provider,
                profiles,
                persistence_enabled,
                state,
                access_token: Mutex::new(None),
            }),
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity().cloned()
    }

    /// Receive every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Token to persist in the browser session so it can be restored later.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        lock(&self.inner.access_token).clone()
    }

    /// Resolve the initial state, restoring `stored_token` if one is given.
    ///
    /// Only the first call does anything; later calls return the current
    /// state.
    pub async fn initialize(&self, stored_token: Option<SecretString>) -> SessionState {
        if *self.inner.state.borrow() != SessionState::Unknown {
            return self.state();
        }

        let restored = match stored_token {
            Some(token) => match self.inner.provider.get_user(&token).await {
                Ok(Some(identity)) => Some((identity, token)),
                Ok(None) => {
                    tracing::debug!("Stored access token is no longer valid");
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to restore session");
                    None
                }
            },
            None => None,
        };

        match restored {
            Some((identity, token)) => {
                *lock(&self.inner.access_token) = Some(token);
                self.become_authenticated(identity);
            }
            None => {
                self.inner.state.send_if_modified(|state| {
                    if *state == SessionState::Unknown {
                        *state = SessionState::Anonymous;
                        true
                    } else {
                        false
                    }
                });
            }
        }
        self.state()
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns the provider's error otherwise; the state is left unchanged.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = Email::parse(email)?;
        let password = SecretString::from(password.to_owned());

        let session = self
            .inner
            .provider
            .sign_in(&email, &password)
            .await
            .inspect_err(|e| tracing::info!(error = %e, "Sign-in failed"))?;

        self.accept(session, "sign_in")
    }

    /// Create an account and sign in when the provider returns a session.
    ///
    /// # Errors
    ///
    /// Returns a validation error before contacting the provider, or the
    /// provider's error; the state is left unchanged in both cases.
    pub async fn sign_up(&self, form: SignUpForm) -> Result<Identity, AuthError> {
        let request = form.validate()?;
        let session = self
            .inner
            .provider
            .sign_up(&request)
            .await
            .inspect_err(|e| tracing::info!(error = %e, "Sign-up failed"))?;

        if session.access_token.is_none() {
            tracing::info!(
                user_id = %session.identity.id,
                "Account created; waiting for email confirmation"
            );
            return Ok(session.identity);
        }
        self.accept(session, "sign_up")
    }

    /// Sign out. Provider failures are logged; the local state always ends
    /// up `Anonymous`.
    pub async fn sign_out(&self) {
        let token = lock(&self.inner.access_token).take();
        if let Some(token) = token
            && let Err(e) = self.inner.provider.sign_out(&token).await
        {
            tracing::warn!(error = %e, "Failed to revoke access token");
        }

        let previous = self.inner.state.send_replace(SessionState::Anonymous);
        if let Some(identity) = previous.identity() {
            tracing::info!(user_id = %identity.id, "Signed out");
        }
        clear_sentry_user();
    }

    /// Ask the provider to send a password recovery email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or the provider's error.
    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        self.inner.provider.reset_password(&email).await
    }

    fn accept(&self, session: AuthSession, via: &'static str) -> Result<Identity, AuthError> {
        let token = session
            .access_token
            .ok_or_else(|| AuthError::Provider("no session returned".to_owned()))?;
        *lock(&self.inner.access_token) = Some(token);

        tracing::info!(user_id = %session.identity.id, via, "Signed in");
        self.become_authenticated(session.identity.clone());
        Ok(session.identity)
    }

    fn become_authenticated(&self, identity: Identity) {
        set_sentry_user(&identity.id, Some(identity.email.as_str()));
        self.inner
            .state
            .send_replace(SessionState::Authenticated(identity.clone()));

        if !self.inner.persistence_enabled {
            tracing::info!(user_id = %identity.id, "Profile upsert skipped: persistence disabled");
            return;
        }
        let profiles = Arc::clone(&self.inner.profiles);
        tokio::spawn(async move {
            ensure_profile(profiles.as_ref(), &identity).await;
        });
    }
}

/// Create the profile row on first sign-in. Never fails the caller.
async fn ensure_profile(profiles: &dyn ProfileRepository, identity: &Identity) {
    match profiles.get_profile(identity.id).await {
        Ok(Some(_)) => {}
        Ok(None) => match profiles.upsert_profile(&Profile::for_identity(identity)).await {
            Ok(()) => tracing::info!(user_id = %identity.id, "Profile created"),
            Err(e) => tracing::warn!(user_id = %identity.id, error = %e, "Profile upsert failed"),
        },
        Err(crate::db::RepositoryError::MissingSchema { table }) => {
            tracing::warn!(table = %table, "Profile upsert skipped: backing table missing");
        }
        Err(e) => tracing::warn!(user_id = %identity.id, error = %e, "Profile lookup failed"),
    }
}
