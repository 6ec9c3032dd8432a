//! Admin user management.
//!
//! ```bash
//! GOBBLE_ADMIN_PASSWORD=... gobble-cli admin create -e ops@gobble.example -n "Ops" -r super_admin
//! ```
//!
//! Admins cannot register through the API; this is the only way to create
//! the first one.

use gobble_core::{AdminRole, Email};
use gobble_server::db::{AccountRepository, RepositoryError};
use gobble_server::services::auth::{AuthError, hash_password, validate_password};
use thiserror::Error;

use super::ConnectError;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid role: {0}. Valid roles: super_admin, admin, viewer")]
    InvalidRole(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] gobble_core::EmailError),

    #[error("No password given. Set GOBBLE_ADMIN_PASSWORD or pass --password")]
    MissingPassword,

    #[error("{0}")]
    Password(#[from] AuthError),

    #[error("Admin user already exists with email: {0}")]
    UserExists(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Create an admin user and return its ID.
///
/// # Errors
///
/// Returns an error for an invalid role, email, or password, an email that
/// is already taken, or a database failure.
pub async fn create_user(
    email: &str,
    name: &str,
    role: &str,
    password: Option<&str>,
) -> Result<i32, AdminError> {
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email)?;
    let password = password.ok_or(AdminError::MissingPassword)?;
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let pool = super::connect().await?;

    tracing::info!("Creating admin user: {} ({})", email, role);
    let admin = AccountRepository::new(&pool)
        .create_admin(&email, name.trim(), role, &password_hash)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        admin.id,
        admin.email,
        admin.role
    );

    Ok(admin.id.as_i32())
}
