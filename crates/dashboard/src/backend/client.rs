//! HTTP client for the order tracking backend.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use ordertrack_core::{Email, ManagerAssignment, UserRecord};

use super::{
    BackendError, DashboardStats, Order, OrderBook, StatusUpdate, TrackingUpdate, UserDirectory,
};
use crate::config::BackendConfig;

/// Backend REST client.
///
/// Cheap to clone; all clones share one connection pool. No request timeout
/// is configured here: callers that need a bound (the guards) apply their own.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| BackendError::Parse(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.api_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    /// The backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Execute a GET request.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let response = self.inner.client.get(self.url(path)).send().await?;
        Self::handle_response(response).await
    }

    /// Execute a POST request, ignoring the response body.
    async fn post<B: serde::Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), BackendError> {
        let response = self.inner.client.post(self.url(path)).json(body).send().await?;
        Self::handle_empty(response).await
    }

    /// Execute a PATCH request, ignoring the response body.
    async fn patch<B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), BackendError> {
        let mut request = self.inner.client.patch(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::handle_empty(response).await
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| BackendError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(Self::parse_error(response).await)
    }

    /// Handle an API response whose body is not needed.
    async fn handle_empty(response: reqwest::Response) -> Result<(), BackendError> {
        if response.status().is_success() {
            return Ok(());
        }

        Err(Self::parse_error(response).await)
    }

    /// Map an error response to a [`BackendError`].
    async fn parse_error(response: reqwest::Response) -> BackendError {
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return BackendError::RateLimited(retry_after);
        }

        if status == 401 || status == 403 {
            return BackendError::Unauthorized;
        }

        if status == 404 {
            return BackendError::NotFound(response.url().path().to_string());
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        BackendError::Api { status, message }
    }
}

/// Percent-encode a value for use as one path segment.
fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[async_trait]
impl UserDirectory for BackendClient {
    #[instrument(skip(self), fields(email = %email))]
    async fn get_user(&self, email: &Email) -> Result<Option<UserRecord>, BackendError> {
        match self.get(&format!("/users/{}", segment(email.as_str()))).await {
            Ok(record) => Ok(Some(record)),
            Err(BackendError::NotFound(_)) => {
                debug!("No backend record for identity");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<UserRecord>, BackendError> {
        self.get("/users").await
    }

    #[instrument(skip(self, record), fields(email = %record.email))]
    async fn create_user(&self, record: &UserRecord) -> Result<(), BackendError> {
        self.post("/users", record).await
    }

    #[instrument(skip(self, update), fields(email = %email, status = %update.status))]
    async fn update_status(
        &self,
        email: &Email,
        update: &StatusUpdate,
    ) -> Result<(), BackendError> {
        self.patch(&format!("/users/{}/status", segment(email.as_str())), Some(update))
            .await
    }

    #[instrument(skip(self, assignment), fields(email = %email))]
    async fn assign_manager(
        &self,
        email: &Email,
        assignment: &ManagerAssignment,
    ) -> Result<(), BackendError> {
        self.patch(
            &format!("/users/{}/manager", segment(email.as_str())),
            Some(assignment),
        )
        .await
    }
}

#[async_trait]
impl OrderBook for BackendClient {
    #[instrument(skip(self), fields(buyer = %buyer))]
    async fn orders_for_buyer(&self, buyer: &Email) -> Result<Vec<Order>, BackendError> {
        self.get(&format!("/orders?buyer={}", segment(buyer.as_str())))
            .await
    }

    #[instrument(skip(self))]
    async fn pending_orders(&self) -> Result<Vec<Order>, BackendError> {
        self.get("/orders/pending").await
    }

    #[instrument(skip(self))]
    async fn approve_order(&self, order_id: &str) -> Result<(), BackendError> {
        self.patch::<()>(&format!("/orders/approve/{}", segment(order_id)), None)
            .await
    }

    #[instrument(skip(self))]
    async fn reject_order(&self, order_id: &str) -> Result<(), BackendError> {
        self.patch::<()>(&format!("/orders/reject/{}", segment(order_id)), None)
            .await
    }

    #[instrument(skip(self))]
    async fn tracking(&self, order_id: &str) -> Result<Vec<TrackingUpdate>, BackendError> {
        let mut updates: Vec<TrackingUpdate> =
            self.get(&format!("/tracking/{}", segment(order_id))).await?;
        updates.sort_by_key(|u| u.at);
        Ok(updates)
    }

    #[instrument(skip(self))]
    async fn stats(&self) -> Result<DashboardStats, BackendError> {
        self.get("/admin/stats").await
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[test]
    fn test_segment_encodes_email() {
        assert_eq!(segment("a+b@example.com"), "a%2Bb%40example.com");
        assert_eq!(segment("665f1c"), "665f1c");
    }

    #[test]
    fn test_new_trims_base_url() {
        let client = BackendClient::new(&BackendConfig {
            api_url: "http://localhost:5000/".to_string(),
            api_token: Some(SecretString::from("tok-Qm81x")),
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(client.url("/users"), "http://localhost:5000/users");
    }

    #[test]
    fn test_new_rejects_invalid_token() {
        let result = BackendClient::new(&BackendConfig {
            api_url: "http://localhost:5000".to_string(),
            api_token: Some(SecretString::from("bad\ntoken")),
        });
        assert!(matches!(result, Err(BackendError::Parse(_))));
    }

    #[test]
    fn test_debug_hides_client_internals() {
        let client = BackendClient::new(&BackendConfig {
            api_url: "http://localhost:5000".to_string(),
            api_token: None,
        })
        .unwrap();
        assert!(format!("{client:?}").contains("http://localhost:5000"));
    }
}
