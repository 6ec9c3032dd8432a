//! Admin moderation: bans and approvals.

use chrono::Utc;
use gobble_core::api::CreateBanRequest;
use gobble_core::moderation::{Ban, BanDurationError};
use gobble_core::{AccountRef, AccountRole, AdminUserId, ApprovalStatus, BanId, RestaurantId};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use crate::db::{AccountRepository, BanRepository, RepositoryError, TokenRepository};
use crate::services::catalogue::MenuCache;
use crate::services::notify::Notifier;

/// Longest ban reason accepted.
const MAX_REASON_LENGTH: usize = 1000;

/// Errors from moderation actions.
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("account not found")]
    AccountNotFound,

    #[error("ban not found or already lifted")]
    BanNotFound,

    #[error(transparent)]
    Duration(#[from] BanDurationError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Bans and approvals. Changes that affect what customers can see also drop
/// the restaurant's cached page.
pub struct ModerationService<'a> {
    pool: &'a PgPool,
    menu_cache: &'a MenuCache,
}

impl<'a> ModerationService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, menu_cache: &'a MenuCache) -> Self {
        Self { pool, menu_cache }
    }

    /// Ban an account and end all of its sessions.
    ///
    /// # Errors
    ///
    /// Returns `ModerationError::InvalidInput` for admin targets or a blank
    /// reason, `ModerationError::Duration` for out-of-range lengths, and
    /// `ModerationError::AccountNotFound` for unknown targets.
    #[instrument(skip(self, request), fields(admin_id = %issued_by, target = %request.target))]
    pub async fn ban(
        &self,
        issued_by: AdminUserId,
        request: &CreateBanRequest,
    ) -> Result<Ban, ModerationError> {
        let target = request.target;
        if !target.role.is_bannable() {
            return Err(ModerationError::InvalidInput(
                "admin accounts cannot be banned".to_owned(),
            ));
        }
        let reason = request.reason.trim();
        super::check_required("reason", reason).map_err(ModerationError::InvalidInput)?;
        if reason.chars().count() > MAX_REASON_LENGTH {
            return Err(ModerationError::InvalidInput(format!(
                "reason cannot exceed {MAX_REASON_LENGTH} characters"
            )));
        }
        let duration = request.duration.validate()?;

        if !AccountRepository::new(self.pool).exists(target).await? {
            return Err(ModerationError::AccountNotFound);
        }

        let starts_at = Utc::now();
        let ban = BanRepository::new(self.pool)
            .create(target, reason, starts_at, duration.ends_at(starts_at), issued_by)
            .await?;
        let revoked = TokenRepository::new(self.pool)
            .revoke_all_for(target)
            .await?;
        self.invalidate(target).await;

        info!(ban_id = %ban.id, %duration, revoked_tokens = revoked, "Account banned");
        let body = ban.ends_at.map_or_else(
            || format!("Your account has been suspended permanently: {reason}"),
            |until| format!("Your account has been suspended until {until}: {reason}"),
        );
        Notifier::new(self.pool).account_update(target, &body).await;
        Ok(ban)
    }

    /// Lift a ban early.
    ///
    /// # Errors
    ///
    /// Returns `ModerationError::BanNotFound` if the ban does not exist or was
    /// already lifted.
    #[instrument(skip(self))]
    pub async fn lift(&self, id: BanId) -> Result<Ban, ModerationError> {
        let ban = BanRepository::new(self.pool)
            .lift(id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ModerationError::BanNotFound,
                other => other.into(),
            })?;
        self.invalidate(ban.target).await;

        info!(target = %ban.target, "Ban lifted");
        Notifier::new(self.pool)
            .account_update(ban.target, "Your account suspension has been lifted")
            .await;
        Ok(ban)
    }

    /// Approve or reject a restaurant or courier.
    ///
    /// # Errors
    ///
    /// Returns `ModerationError::AccountNotFound` for unknown accounts and
    /// `ModerationError::InvalidInput` for roles without approval.
    #[instrument(skip(self))]
    pub async fn set_approval(
        &self,
        account: AccountRef,
        status: ApprovalStatus,
    ) -> Result<(), ModerationError> {
        if !matches!(account.role, AccountRole::Restaurant | AccountRole::Courier) {
            return Err(ModerationError::InvalidInput(
                "only restaurants and couriers need approval".to_owned(),
            ));
        }
        AccountRepository::new(self.pool)
            .set_approval(account, status)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ModerationError::AccountNotFound,
                other => other.into(),
            })?;
        self.invalidate(account).await;

        info!(?status, "Approval status changed");
        let body = match status {
            ApprovalStatus::Accepted => "Your account has been approved",
            ApprovalStatus::Rejected => "Your account application was rejected",
            ApprovalStatus::Pending => "Your account is pending review",
        };
        Notifier::new(self.pool).account_update(account, body).await;
        Ok(())
    }

    async fn invalidate(&self, account: AccountRef) {
        if account.role == AccountRole::Restaurant {
            self.menu_cache
                .invalidate(RestaurantId::new(account.id))
                .await;
        }
    }
}
