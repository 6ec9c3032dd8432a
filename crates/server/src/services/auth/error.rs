//! Authentication error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] gobble_core::EmailError),

    /// Invalid credentials (wrong password or account not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists for the role.
    #[error("account already exists")]
    AccountExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// A registration field is missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No bearer token on the request.
    #[error("missing bearer token")]
    MissingToken,

    /// Bearer token unknown, expired, or revoked.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The account is under an active ban.
    #[error("account banned: {reason}")]
    Banned {
        until: Option<DateTime<Utc>>,
        reason: String,
    },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token digest could not be computed.
    #[error("token digest error")]
    TokenDigest,
}
