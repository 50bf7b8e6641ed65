//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Responses carry a JSON body `{ "error": "<message>" }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::{AdminError, CheckoutError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Checkout rejected the order.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Admin operation failed.
    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Auth(AuthError::Http(_) | AuthError::PasswordHash)
                | Self::Admin(AdminError::Repository(_))
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                AuthError::Http(_) => StatusCode::BAD_GATEWAY,
                AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
                AuthError::InvalidEmail(_)
                | AuthError::MissingField(_)
                | AuthError::PasswordMismatch
                | AuthError::WeakPassword(_)
                | AuthError::Provider(_) => StatusCode::BAD_REQUEST,
            },
            Self::Checkout(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Admin(err) => match err {
                AdminError::Forbidden => StatusCode::FORBIDDEN,
                AdminError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                AdminError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn client_message(&self) -> String {
        // Don't expose internal error details to clients
        match self {
            Self::Database(_) | Self::Internal(_) | Self::Admin(AdminError::Repository(_)) => {
                "Internal server error".to_string()
            }
            Self::Auth(err) => err.user_message(),
            Self::Checkout(err) => err.to_string(),
            Self::Admin(AdminError::Forbidden) => "Admin access required".to_string(),
            Self::Admin(AdminError::ProductNotFound(id)) => format!("Product not found: {id}"),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = serde_json::json!({ "error": self.client_message() });
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "add", Some(&[("product_id", "4")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use beanvoyage_core::ProductId;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 42".to_string());
        assert_eq!(err.to_string(), "Not found: product 42");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::PasswordMismatch)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::NotConfigured)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Admin(AdminError::Forbidden)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Admin(AdminError::ProductNotFound(ProductId::from("9")))),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption(
            "invalid email in database".to_string(),
        ));
        assert_eq!(err.client_message(), "Internal server error");
        assert_eq!(
            AppError::Auth(AuthError::InvalidCredentials).client_message(),
            "Invalid login credentials"
        );
    }
}
