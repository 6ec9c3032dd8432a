//! Registration, login, and session operations.

use gobble_core::AccountRole;
use gobble_core::api::{
    LoginRequest, LoginResponse, RegisterCourier, RegisterCustomer, RegisterRestaurant,
    Registered, SessionInfo,
};
use reqwest::Method;
use tracing::{info, instrument, warn};

use crate::client::ApiClient;
use crate::error::ClientError;

impl ApiClient {
    /// Create a customer account. Customers can log in straight away.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 409 if the email is taken.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register_customer(
        &self,
        request: &RegisterCustomer,
    ) -> Result<Registered, ClientError> {
        self.post("api/auth/register/customer", request).await
    }

    /// Create a restaurant account, pending admin approval.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register_restaurant(
        &self,
        request: &RegisterRestaurant,
    ) -> Result<Registered, ClientError> {
        self.post("api/auth/register/restaurant", request).await
    }

    /// Create a courier account, pending admin approval.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register_courier(
        &self,
        request: &RegisterCourier,
    ) -> Result<Registered, ClientError> {
        self.post("api/auth/register/courier", request).await
    }

    /// Log in and store the returned token.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with code `invalid_credentials` for a bad
    /// email or password, and `ClientError::Banned` for a suspended account.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        role: AccountRole,
        email: &str,
        password: &str,
    ) -> Result<SessionInfo, ClientError> {
        let request = LoginRequest {
            role,
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let response: LoginResponse = self.post("api/auth/login", &request).await?;
        self.tokens().save(&response.token)?;
        info!(account_id = response.session.account_id, "Logged in");
        Ok(response.session)
    }

    /// Revoke the token on the server and forget it locally.
    ///
    /// The local token is cleared even when the server call fails.
    ///
    /// # Errors
    ///
    /// Returns error if the server could not be reached.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self
            .send_no_content::<()>(Method::POST, "api/auth/logout", None)
            .await;
        self.tokens().clear();
        match result {
            // Already gone on the server side.
            Err(ClientError::SessionExpired) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Logout request failed");
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }

    /// Who the stored token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::SessionExpired` (and clears the token) if the
    /// token is no longer valid.
    #[instrument(skip(self))]
    pub async fn session(&self) -> Result<SessionInfo, ClientError> {
        self.get("api/auth/session").await
    }
}
