//! Admin console: dashboard, account approval, bans, coupons, promotions.

use gobble_core::api::{
    AccountListQuery, AccountSummary, ApprovalUpdate, BanListQuery, CouponInput, CouponView,
    CreateBanRequest, DashboardStats, PromotionInput, PromotionView,
};
use gobble_core::listing::Page;
use gobble_core::moderation::{Ban, BanDuration};
use gobble_core::{AccountRef, AccountRole, ApprovalStatus, BanId, CouponId, PromotionId};
use reqwest::Method;
use tracing::instrument;

use crate::client::ApiClient;
use crate::error::ClientError;

impl ApiClient {
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardStats, ClientError> {
        self.get("api/admin/dashboard").await
    }

    /// Search, filter, sort, and page one kind of account.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn accounts(
        &self,
        role: AccountRole,
        query: &AccountListQuery,
    ) -> Result<Page<AccountSummary>, ClientError> {
        self.get_query(&format!("api/admin/accounts/{role}"), query)
            .await
    }

    /// Approve, reject, or return a restaurant or courier to pending.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 403 for viewer admins.
    #[instrument(skip(self))]
    pub async fn set_approval(
        &self,
        account: AccountRef,
        status: ApprovalStatus,
    ) -> Result<(), ClientError> {
        self.send_no_content(
            Method::PUT,
            &format!("api/admin/accounts/{}/{}/approval", account.role, account.id),
            Some(&ApprovalUpdate { status }),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn bans(&self, query: &BanListQuery) -> Result<Page<Ban>, ClientError> {
        self.get_query("api/admin/bans", query).await
    }

    /// Ban an account. The target's tokens are revoked immediately.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, reason))]
    pub async fn ban(
        &self,
        target: AccountRef,
        reason: &str,
        duration: BanDuration,
    ) -> Result<Ban, ClientError> {
        let request = CreateBanRequest {
            target,
            reason: reason.to_owned(),
            duration,
        };
        self.post("api/admin/bans", &request).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn lift_ban(&self, id: BanId) -> Result<Ban, ClientError> {
        self.post_action(&format!("api/admin/bans/{id}/lift")).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn coupons(&self) -> Result<Vec<CouponView>, ClientError> {
        self.get("api/admin/coupons").await
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 409 if the code already exists.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_coupon(&self, input: &CouponInput) -> Result<CouponView, ClientError> {
        self.post("api/admin/coupons", input).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, input))]
    pub async fn update_coupon(
        &self,
        id: CouponId,
        input: &CouponInput,
    ) -> Result<CouponView, ClientError> {
        self.put(&format!("api/admin/coupons/{id}"), input).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn delete_coupon(&self, id: CouponId) -> Result<(), ClientError> {
        self.delete(&format!("api/admin/coupons/{id}")).await
    }

    /// Every promotion, platform-wide and per-restaurant.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn all_promotions(&self) -> Result<Vec<PromotionView>, ClientError> {
        self.get("api/admin/promotions").await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, input))]
    pub async fn create_promotion(&self, input: &PromotionInput) -> Result<PromotionView, ClientError> {
        self.post("api/admin/promotions", input).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, input))]
    pub async fn update_promotion(
        &self,
        id: PromotionId,
        input: &PromotionInput,
    ) -> Result<PromotionView, ClientError> {
        self.put(&format!("api/admin/promotions/{id}"), input).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn delete_promotion(&self, id: PromotionId) -> Result<(), ClientError> {
        self.delete(&format!("api/admin/promotions/{id}")).await
    }
}
