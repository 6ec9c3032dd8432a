//! Authentication service.
//!
//! Password registration and login for every role, and bearer-token
//! sessions. Raw tokens are handed out once at login; only their HMAC digest
//! is stored.

mod error;
pub mod token;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use gobble_core::api::{
    LoginRequest, LoginResponse, RegisterCourier, RegisterCustomer, RegisterRestaurant, Registered,
};
use gobble_core::{AccountRef, AccountRole, Email, GeoPoint};
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::config::ServerConfig;
use crate::db::{
    AccountRepository, BanRepository, CourierRepository, RepositoryError, RestaurantRepository,
    TokenRepository,
};
use crate::models::Principal;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    config: &'a ServerConfig,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, config: &'a ServerConfig) -> Self {
        Self { pool, config }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a customer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::WeakPassword`, or
    /// `AuthError::InvalidInput` for bad input, and `AuthError::AccountExists`
    /// if the email is taken.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register_customer(&self, input: &RegisterCustomer) -> Result<Registered, AuthError> {
        let email = Email::parse(&input.email)?;
        require_text("name", &input.name)?;
        validate_password(&input.password)?;
        let password_hash = hash_password(&input.password)?;

        let phone = input.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());
        let customer = AccountRepository::new(self.pool)
            .create_customer(&email, input.name.trim(), phone, &password_hash)
            .await
            .map_err(account_exists)?;

        info!(customer_id = %customer.id, "Customer registered");
        Ok(Registered {
            role: AccountRole::Customer,
            account_id: customer.id.as_i32(),
            approval_status: None,
        })
    }

    /// Register a restaurant. It stays `pending` until an admin approves it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::register_customer`], plus `AuthError::InvalidInput` for
    /// bad coordinates or delivery radius.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register_restaurant(
        &self,
        input: &RegisterRestaurant,
    ) -> Result<Registered, AuthError> {
        let email = Email::parse(&input.email)?;
        for (field, value) in [
            ("name", &input.name),
            ("cuisine", &input.cuisine),
            ("phone", &input.phone),
            ("street", &input.street),
            ("city", &input.city),
        ] {
            require_text(field, value)?;
        }
        validate_location(&input.location)?;
        validate_radius(input.delivery_radius_km)?;
        validate_password(&input.password)?;
        let password_hash = hash_password(&input.password)?;

        let restaurant = RestaurantRepository::new(self.pool)
            .create(&email, input, &password_hash)
            .await
            .map_err(account_exists)?;

        info!(restaurant_id = %restaurant.id, "Restaurant registered");
        Ok(Registered {
            role: AccountRole::Restaurant,
            account_id: restaurant.id.as_i32(),
            approval_status: Some(restaurant.approval_status),
        })
    }

    /// Register a courier. It stays `pending` until an admin approves it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::register_customer`].
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register_courier(&self, input: &RegisterCourier) -> Result<Registered, AuthError> {
        let email = Email::parse(&input.email)?;
        for (field, value) in [
            ("name", &input.name),
            ("phone", &input.phone),
            ("vehicle", &input.vehicle),
        ] {
            require_text(field, value)?;
        }
        validate_password(&input.password)?;
        let password_hash = hash_password(&input.password)?;

        let courier = CourierRepository::new(self.pool)
            .create(&email, input, &password_hash)
            .await
            .map_err(account_exists)?;

        info!(courier_id = %courier.id, "Courier registered");
        Ok(Registered {
            role: AccountRole::Courier,
            account_id: courier.id.as_i32(),
            approval_status: Some(courier.approval_status),
        })
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Verify credentials and issue a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong
    /// and `AuthError::Banned` while the account is banned.
    #[instrument(skip(self, input), fields(role = %input.role, email = %input.email))]
    pub async fn login(&self, input: &LoginRequest) -> Result<LoginResponse, AuthError> {
        let email = Email::parse(&input.email).map_err(|_| AuthError::InvalidCredentials)?;

        let (account_id, password_hash) = AccountRepository::new(self.pool)
            .find_credentials(input.role, &email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(&input.password, &password_hash)?;

        let account = AccountRef::new(input.role, account_id);
        if let Some(ban) = BanRepository::new(self.pool).active_for(account).await? {
            info!(%account, ban_id = %ban.id, "Login refused for banned account");
            return Err(AuthError::Banned {
                until: ban.ends_at,
                reason: ban.reason,
            });
        }

        let token = token::generate_token();
        let digest = token::digest_token(&self.config.token_secret, &token)?;
        let expires_at = Utc::now() + self.config.token_ttl;
        let record = TokenRepository::new(self.pool)
            .create(&digest, account, expires_at)
            .await?;

        let principal = self.load_principal(record.id, account, record.expires_at).await?;

        info!(%account, "Login succeeded");
        Ok(LoginResponse {
            token,
            session: principal.session_info(),
        })
    }

    /// Resolve a raw bearer token to its principal.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is unknown or expired.
    pub async fn authenticate(&self, raw_token: &str) -> Result<Principal, AuthError> {
        let digest = token::digest_token(&self.config.token_secret, raw_token)?;
        let record = TokenRepository::new(self.pool)
            .resolve(&digest)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        self.load_principal(record.id, record.account(), record.expires_at)
            .await
    }

    /// Revoke the token behind `principal`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the delete fails.
    #[instrument(skip(self, principal), fields(account = %principal.account))]
    pub async fn logout(&self, principal: &Principal) -> Result<(), AuthError> {
        TokenRepository::new(self.pool)
            .revoke(principal.token_id)
            .await?;
        Ok(())
    }

    async fn load_principal(
        &self,
        token_id: i64,
        account: AccountRef,
        expires_at: chrono::DateTime<Utc>,
    ) -> Result<Principal, AuthError> {
        let identity = AccountRepository::new(self.pool)
            .identity(account)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        Ok(Principal {
            token_id,
            account,
            name: identity.name,
            email: identity.email,
            approval_status: identity.approval_status,
            admin_role: identity.admin_role,
            expires_at,
        })
    }
}

fn account_exists(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::Conflict(_) => AuthError::AccountExists,
        other => AuthError::Repository(other),
    }
}

fn require_text(field: &str, value: &str) -> Result<(), AuthError> {
    super::check_required(field, value).map_err(AuthError::InvalidInput)
}

fn validate_location(location: &GeoPoint) -> Result<(), AuthError> {
    super::check_location(location).map_err(AuthError::InvalidInput)
}

fn validate_radius(radius_km: f64) -> Result<(), AuthError> {
    super::check_radius(radius_km).map_err(AuthError::InvalidInput)
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` for passwords that are too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
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

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("longenough").is_ok());
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_radius_and_text_validation() {
        assert!(validate_radius(3.5).is_ok());
        assert!(validate_radius(0.0).is_err());
        assert!(validate_radius(f64::NAN).is_err());
        assert!(require_text("name", "  ").is_err());
        assert!(require_text("name", "Ada").is_ok());
    }

    #[test]
    fn test_unvalidated_location_rejected() {
        let bad = GeoPoint {
            latitude: 123.0,
            longitude: 0.0,
        };
        assert!(matches!(
            validate_location(&bad),
            Err(AuthError::InvalidInput(_))
        ));
    }
}
