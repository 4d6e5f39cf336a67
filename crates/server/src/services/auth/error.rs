//! Authentication error types.

use thiserror::Error;

use dronshop_core::ContactType;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] dronshop_core::EmailError),

    /// Invalid phone format.
    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] dronshop_core::PhoneError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but an admin blocked it.
    #[error("user is blocked")]
    Blocked,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// The phone or email is taken.
    #[error("{0} already registered")]
    AlreadyRegistered(ContactType),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    #[error("passwords do not match")]
    PasswordMismatch,

    /// SMS code missing, expired or wrong.
    #[error("invalid or expired code")]
    InvalidCode,

    /// Dev login requested while dev mode is off.
    #[error("dev login disabled")]
    DevLoginDisabled,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
