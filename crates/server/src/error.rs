//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Every error body has the shape `{"detail": "<message>"}`.

use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use dronshop_core::ContactType;

use crate::db::RepositoryError;
use crate::services::auth::{AuthError, TokenError};
use crate::services::catalog::CategoryTreeError;
use crate::services::checkout::CheckoutError;
use crate::services::media::MediaError;

const INTERNAL: &str = "Internal server error";

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Bearer token rejected.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Checkout refused or failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Invalid category parent.
    #[error("Category error: {0}")]
    Category(#[from] CategoryTreeError),

    /// Image upload failed.
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but lacking a required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited {
        /// Seconds until the window resets.
        retry_after: u64,
    },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn repository_response(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        RepositoryError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
        }
    }
}

impl AppError {
    /// Status code and client-facing message.
    ///
    /// Internal error details are never exposed to clients.
    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) => repository_response(err),
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(e) => (StatusCode::BAD_REQUEST, format!("Invalid email: {e}")),
                AuthError::InvalidPhone(e) => (StatusCode::BAD_REQUEST, format!("Invalid phone: {e}")),
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
                }
                AuthError::Blocked => (StatusCode::FORBIDDEN, "User is blocked".to_string()),
                AuthError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
                AuthError::AlreadyRegistered(ContactType::Phone) => {
                    (StatusCode::BAD_REQUEST, "Phone already registered".to_string())
                }
                AuthError::AlreadyRegistered(ContactType::Email) => {
                    (StatusCode::BAD_REQUEST, "Email already registered".to_string())
                }
                AuthError::WeakPassword(_) => {
                    (StatusCode::BAD_REQUEST, "Password too short".to_string())
                }
                AuthError::PasswordMismatch => {
                    (StatusCode::BAD_REQUEST, "Passwords do not match".to_string())
                }
                AuthError::InvalidCode => {
                    (StatusCode::BAD_REQUEST, "Invalid or expired code".to_string())
                }
                AuthError::DevLoginDisabled => (StatusCode::NOT_FOUND, "Not found".to_string()),
                AuthError::Repository(err) => repository_response(err),
                AuthError::PasswordHash => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
                }
            },
            Self::Token(err) => match err {
                TokenError::Expired => (StatusCode::UNAUTHORIZED, "Token expired".to_string()),
                TokenError::Malformed => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
                TokenError::WrongType => {
                    (StatusCode::UNAUTHORIZED, "Invalid token type".to_string())
                }
                TokenError::Encoding(_) | TokenError::LifetimeOutOfRange => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
                }
            },
            Self::Checkout(err) => match err {
                CheckoutError::Repository(err) => repository_response(err),
                other => (StatusCode::BAD_REQUEST, other.to_string()),
            },
            Self::Category(err) => match err {
                CategoryTreeError::ParentNotFound => (StatusCode::NOT_FOUND, err.to_string()),
                CategoryTreeError::SelfParent | CategoryTreeError::Cycle => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
            },
            Self::Media(err) => match err {
                MediaError::NotAnImage => (StatusCode::BAD_REQUEST, err.to_string()),
                MediaError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
            },
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please try again later".to_string(),
            ),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let mut response = (status, Json(json!({ "detail": detail }))).into_response();
        if let Self::RateLimited { retry_after } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
        response
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Turn a missing row into a 404 with a resource-specific message.
pub trait OrNotFound<T> {
    /// # Errors
    ///
    /// Returns `AppError::NotFound(message)` for `Ok(None)` and
    /// `AppError::Database` for query failures.
    fn or_not_found(self, message: &str) -> Result<T>;
}

impl<T> OrNotFound<T> for std::result::Result<Option<T>, RepositoryError> {
    fn or_not_found(self, message: &str) -> Result<T> {
        match self {
            Ok(Some(value)) => Ok(value),
            Ok(None) | Err(RepositoryError::NotFound) => {
                Err(AppError::NotFound(message.to_string()))
            }
            Err(other) => Err(AppError::Database(other)),
        }
    }
}

/// Give `RepositoryError::NotFound` a resource-specific 404 message.
pub trait MapNotFound<T> {
    /// # Errors
    ///
    /// Returns `AppError::NotFound(message)` for `RepositoryError::NotFound`
    /// and `AppError::Database` for anything else.
    fn map_not_found(self, message: &str) -> Result<T>;
}

impl<T> MapNotFound<T> for std::result::Result<T, RepositoryError> {
    fn map_not_found(self, message: &str) -> Result<T> {
        self.map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(message.to_string()),
            other => AppError::Database(other),
        })
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn detail(err: AppError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, body["detail"].as_str().unwrap().to_string())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::Blocked)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Token(TokenError::Expired)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Category(CategoryTreeError::ParentNotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited { retry_after: 17 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "17");
    }

    #[tokio::test]
    async fn test_detail_bodies() {
        assert_eq!(
            detail(AppError::Checkout(CheckoutError::EmptyCart)).await,
            (StatusCode::BAD_REQUEST, "Cart is empty".to_string())
        );
        assert_eq!(
            detail(AppError::Auth(AuthError::AlreadyRegistered(ContactType::Email))).await,
            (StatusCode::BAD_REQUEST, "Email already registered".to_string())
        );
        assert_eq!(
            detail(AppError::Database(RepositoryError::Conflict(
                "Category with this slug already exists".to_string()
            )))
            .await,
            (
                StatusCode::BAD_REQUEST,
                "Category with this slug already exists".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, message) =
            detail(AppError::Internal("connection refused at 10.0.0.3".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }

    #[test]
    fn test_not_found_helpers() {
        let missing: std::result::Result<Option<i32>, RepositoryError> = Ok(None);
        assert!(matches!(
            missing.or_not_found("Product not found"),
            Err(AppError::NotFound(msg)) if msg == "Product not found"
        ));

        let gone: std::result::Result<(), RepositoryError> = Err(RepositoryError::NotFound);
        assert!(matches!(
            gone.map_not_found("Review not found"),
            Err(AppError::NotFound(_))
        ));
    }
}
