//! In-process identity provider with argon2-hashed passwords.
//!
//! Accounts and access tokens live only as long as the process. Sign-up
//! confirms immediately and returns a token.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use beanvoyage_core::{Email, UserId};

use super::{AuthError, AuthSession, IdentityProvider, SignUpRequest};
use crate::models::Identity;

struct Account {
    identity: Identity,
    password_hash: String,
}

/// In-memory identity provider.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    tokens: Mutex<HashMap<String, UserId>>,
    recovery_requests: Mutex<Vec<Email>>,
}

impl std::fmt::Debug for MemoryIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryIdentityProvider")
            .field("accounts", &lock(&self.accounts).len())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emails a recovery was requested for, oldest first.
    #[must_use]
    pub fn recovery_requests(&self) -> Vec<Email> {
        lock(&self.recovery_requests).clone()
    }

    fn issue_token(&self, user_id: UserId) -> SecretString {
        let token = Uuid::new_v4().simple().to_string();
        lock(&self.tokens).insert(token.clone(), user_id);
        SecretString::from(token)
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<AuthSession, AuthError> {
        let password_hash = hash_password(request.password.expose_secret())?;
        let identity = Identity {
            id: UserId::generate(),
            email: request.email.clone(),
            first_name: Some(request.first_name.clone()),
            last_name: Some(request.last_name.clone()),
        };

        {
            let mut accounts = lock(&self.accounts);
            if accounts.contains_key(request.email.as_str()) {
                return Err(AuthError::UserAlreadyExists);
            }
            accounts.insert(
                request.email.as_str().to_owned(),
                Account {
                    identity: identity.clone(),
                    password_hash,
                },
            );
        }

        let access_token = self.issue_token(identity.id);
        Ok(AuthSession {
            identity,
            access_token: Some(access_token),
        })
    }

    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, AuthError> {
        let (identity, password_hash) = {
            let accounts = lock(&self.accounts);
            let account = accounts
                .get(email.as_str())
                .ok_or(AuthError::InvalidCredentials)?;
            (account.identity.clone(), account.password_hash.clone())
        };

        verify_password(password.expose_secret(), &password_hash)?;

        let access_token = self.issue_token(identity.id);
        Ok(AuthSession {
            identity,
            access_token: Some(access_token),
        })
    }

    async fn sign_out(&self, access_token: &SecretString) -> Result<(), AuthError> {
        lock(&self.tokens).remove(access_token.expose_secret());
        Ok(())
    }

    async fn get_user(&self, access_token: &SecretString) -> Result<Option<Identity>, AuthError> {
        let Some(user_id) = lock(&self.tokens).get(access_token.expose_secret()).copied() else {
            return Ok(None);
        };
        Ok(lock(&self.accounts)
            .values()
            .find(|a| a.identity.id == user_id)
            .map(|a| a.identity.clone()))
    }

    async fn reset_password(&self, email: &Email) -> Result<(), AuthError> {
        // Accepted whether or not the account exists
        lock(&self.recovery_requests).push(email.clone());
        Ok(())
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::auth::SignUpForm;

    fn request() -> SignUpRequest {
        SignUpForm {
            email: "ada@beanvoyage.coffee".to_owned(),
            password: "espresso".to_owned(),
            confirm_password: "espresso".to_owned(),
            first_name: "Ada".to_owned(),
            last_name: "Byron".to_owned(),
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("espresso").unwrap();
        assert!(verify_password("espresso", &hash).is_ok());
        assert!(matches!(
            verify_password("decaf", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let provider = MemoryIdentityProvider::new();
        let created = provider.sign_up(&request()).await.unwrap();

        let session = provider
            .sign_in(&request().email, &SecretString::from("espresso"))
            .await
            .unwrap();
        assert_eq!(session.identity, created.identity);

        let token = session.access_token.unwrap();
        let restored = provider.get_user(&token).await.unwrap();
        assert_eq!(restored, Some(created.identity));
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_rejected() {
        let provider = MemoryIdentityProvider::new();
        provider.sign_up(&request()).await.unwrap();
        assert!(matches!(
            provider.sign_up(&request()).await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user() {
        let provider = MemoryIdentityProvider::new();
        provider.sign_up(&request()).await.unwrap();
        assert!(matches!(
            provider
                .sign_in(&request().email, &SecretString::from("decaf!"))
                .await,
            Err(AuthError::InvalidCredentials)
        ));
        let stranger = Email::parse("bob@beanvoyage.coffee").unwrap();
        assert!(matches!(
            provider
                .sign_in(&stranger, &SecretString::from("espresso"))
                .await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_sign_out_revokes_token() {
        let provider = MemoryIdentityProvider::new();
        let token = provider.sign_up(&request()).await.unwrap().access_token.unwrap();
        provider.sign_out(&token).await.unwrap();
        assert!(provider.get_user(&token).await.unwrap().is_none());
    }
}
