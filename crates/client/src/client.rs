//! HTTP plumbing shared by every API area.
//!
//! Every request carries `Authorization: Bearer <token>` when a token is
//! stored. Error responses are decoded from the server's `ErrorBody` and
//! mapped onto [`ClientError`]:
//!
//! - 401 (except a failed login) clears the token: `SessionExpired`
//! - 409 `cart_conflict` becomes `CartConflict`
//! - 409 `prices_changed` becomes `PricesChanged`
//! - 403 `account_banned` becomes `Banned`
//! - anything else becomes `Api`

use std::sync::Arc;

use gobble_core::api::{BannedDetails, CartConflictDetails, ErrorBody};
use gobble_core::cart::PriceChange;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::ClientError;
use crate::token::TokenStore;

/// Client for the Gobble REST API.
///
/// Cheap to clone; clones share the HTTP connection pool and token store.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Url` for an unparseable base URL and
    /// `ClientError::Http` if the HTTP client fails to build.
    pub fn new(base_url: &str, tokens: Arc<dyn TokenStore>) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("gobble-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url,
                tokens,
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Whether a token is stored. Says nothing about whether it is still
    /// valid; the session watch finds that out.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.inner.tokens.load().is_some()
    }

    pub(crate) fn tokens(&self) -> &dyn TokenStore {
        self.inner.tokens.as_ref()
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let mut builder = self.inner.http.request(method, self.url(path)?);
        if let Some(token) = self.inner.tokens.load() {
            builder = builder.bearer_auth(token.expose_secret());
        }
        Ok(builder)
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(self.request(Method::GET, path)?).await
    }

    pub(crate) async fn get_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ClientError> {
        self.execute(self.request(Method::GET, path)?.query(query))
            .await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.execute(self.request(Method::POST, path)?.json(body))
            .await
    }

    /// POST without a body, for action endpoints like `/cancel`.
    pub(crate) async fn post_action<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(self.request(Method::POST, path)?).await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.execute(self.request(Method::PUT, path)?.json(body))
            .await
    }

    pub(crate) async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.execute(self.request(Method::PATCH, path)?.json(body))
            .await
    }

    /// A request whose success response has no body worth reading.
    pub(crate) async fn send_no_content<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ClientError> {
        let mut builder = self.request(method, path)?;
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(self.parse_error(response).await)
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.send_no_content::<()>(Method::DELETE, path, None).await
    }

    /// DELETE for endpoints that answer with the updated resource.
    pub(crate) async fn delete_returning<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ClientError> {
        self.execute(self.request(Method::DELETE, path)?).await
    }

    /// POST returning the status code as well, for endpoints where 200 and
    /// 201 mean different things.
    pub(crate) async fn post_with_status<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(StatusCode, T), ClientError> {
        let response = self.request(Method::POST, path)?.json(body).send().await?;
        let status = response.status();
        let value = self.handle_response(response).await?;
        Ok((status, value))
    }

    // =========================================================================
    // Responses
    // =========================================================================

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, ClientError> {
        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| ClientError::Parse(format!("Failed to parse response: {e}")));
        }
        Err(self.parse_error(response).await)
    }

    async fn parse_error(&self, response: Response) -> ClientError {
        let status = response.status().as_u16();
        let body = response.json::<ErrorBody>().await.ok();
        let error = map_error(status, body);

        if matches!(error, ClientError::SessionExpired) {
            warn!("Session rejected by server, clearing token");
            self.inner.tokens.clear();
        } else {
            debug!(status, error = %error, "API request failed");
        }
        error
    }
}

/// Map a non-success status and its decoded body to a [`ClientError`].
fn map_error(status: u16, body: Option<ErrorBody>) -> ClientError {
    let ErrorBody {
        error: code,
        message,
        details,
    } = body.unwrap_or_else(|| ErrorBody {
        error: String::new(),
        message: StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown error")
            .to_owned(),
        details: None,
    });

    match (status, code.as_str()) {
        // A failed login is not an expired session.
        (401, "invalid_credentials") => {}
        (401, _) => return ClientError::SessionExpired,
        (409, "cart_conflict") => {
            if let Some(details) = details
                .clone()
                .and_then(|d| serde_json::from_value::<CartConflictDetails>(d).ok())
            {
                return ClientError::CartConflict {
                    current_restaurant: details.current_restaurant,
                    message,
                };
            }
        }
        (409, "prices_changed") => {
            let changes = details
                .clone()
                .and_then(|d| d.get("price_changes").cloned())
                .and_then(|d| serde_json::from_value::<Vec<PriceChange>>(d).ok())
                .unwrap_or_default();
            return ClientError::PricesChanged(changes);
        }
        (403, "account_banned") => {
            if let Some(details) = details
                .clone()
                .and_then(|d| serde_json::from_value::<BannedDetails>(d).ok())
            {
                return ClientError::Banned {
                    until: details.until,
                    reason: details.reason,
                };
            }
        }
        _ => {}
    }

    ClientError::Api {
        status,
        code,
        message,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gobble_core::RestaurantId;
    use gobble_core::cart::CartRestaurant;
    use serde_json::json;

    use super::*;
    use crate::token::MemoryTokenStore;

    fn body(code: &str, details: Option<serde_json::Value>) -> Option<ErrorBody> {
        Some(ErrorBody {
            error: code.to_owned(),
            message: "msg".to_owned(),
            details,
        })
    }

    #[test]
    fn test_unauthorized_is_session_expired() {
        assert!(matches!(
            map_error(401, body("unauthorized", None)),
            ClientError::SessionExpired
        ));
        assert!(matches!(map_error(401, None), ClientError::SessionExpired));
    }

    #[test]
    fn test_failed_login_is_not_session_expired() {
        let err = map_error(401, body("invalid_credentials", None));
        assert!(matches!(err, ClientError::Api { status: 401, ref code, .. } if code == "invalid_credentials"));
    }

    #[test]
    fn test_cart_conflict_details() {
        let details = serde_json::to_value(CartConflictDetails {
            current_restaurant: CartRestaurant {
                id: RestaurantId::new(4),
                name: "Pho Real".to_owned(),
            },
        })
        .unwrap();
        match map_error(409, body("cart_conflict", Some(details))) {
            ClientError::CartConflict {
                current_restaurant, ..
            } => assert_eq!(current_restaurant.id, RestaurantId::new(4)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_other_conflicts_stay_generic() {
        let err = map_error(409, body("conflict", Some(json!({}))));
        assert!(matches!(err, ClientError::Api { status: 409, .. }));
    }

    #[test]
    fn test_empty_body_uses_reason_phrase() {
        match map_error(502, None) {
            ClientError::Api { message, .. } => assert_eq!(message, "Bad Gateway"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = ApiClient::new(
            "http://localhost:3000/gobble",
            Arc::new(MemoryTokenStore::new()),
        )
        .unwrap();
        assert_eq!(
            client.url("/api/cart").unwrap().as_str(),
            "http://localhost:3000/gobble/api/cart"
        );
    }
}
