//! Integration test harness for the order tracker dashboard.
//!
//! Provides in-memory stand-ins for the identity provider and the backend,
//! and a [`TestApp`] that drives the real router with
//! `tower::ServiceExt::oneshot`. No network access is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ordertrack-integration-tests
//! ```

#![allow(clippy::missing_panics_doc)]

use std::collections::{BTreeMap, HashMap};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use futures::stream::BoxStream;
use secrecy::{ExposeSecret, SecretString};
use tower::ServiceExt;

use ordertrack_core::{AccountStatus, Email, Identity, ManagerAssignment, Role, UserRecord};
use ordertrack_dashboard::backend::{
    BackendError, DashboardStats, Order, OrderBook, OrderStatus, StatusUpdate, TrackingUpdate,
    UserDirectory,
};
use ordertrack_dashboard::config::{BackendConfig, DashboardConfig, GuardConfig, IdentityConfig};
use ordertrack_dashboard::identity::{
    AuthStateChannel, IdentityError, IdentityProvider, ProfileUpdate,
};
use ordertrack_dashboard::routes;
use ordertrack_dashboard::state::AppState;

/// Parse a test email.
#[must_use]
pub fn email(raw: &str) -> Email {
    Email::parse(raw).expect("test email must be valid")
}

/// A backend record with the given role and status.
#[must_use]
pub fn record(raw_email: &str, role: Role, status: AccountStatus) -> UserRecord {
    let mut record = UserRecord::new_buyer(email(raw_email), raw_email.to_string());
    record.role = Some(role);
    record.status = Some(status);
    record
}

/// Identity matching `record`.
#[must_use]
pub fn identity_for(record: &UserRecord) -> Identity {
    Identity {
        id: format!("uid-{}", record.email.local_part()),
        email: Some(record.email.clone()),
        display_name: Some(record.name.clone()),
        photo_url: None,
    }
}

// =============================================================================
// Identity Provider
// =============================================================================

/// In-memory identity provider.
///
/// Accounts are keyed by email; sign-in and sign-out publish to the same
/// auth-state channel the REST provider uses.
#[derive(Default)]
pub struct FakeIdentityProvider {
    auth: AuthStateChannel,
    accounts: Mutex<HashMap<Email, (String, Identity)>>,
    fail_sign_out: AtomicBool,
}

impl FakeIdentityProvider {
    /// Register an account that can sign in with `password`.
    pub fn add_account(&self, identity: Identity, password: &str) {
        let email = identity.email.clone().expect("account needs an email");
        self.accounts
            .lock()
            .expect("accounts lock")
            .insert(email, (password.to_string(), identity));
    }

    /// Publish `identity` as if a sign-in completed elsewhere.
    pub fn publish(&self, identity: Option<Identity>) {
        self.auth.publish(identity);
    }

    /// Make the next sign-out calls fail.
    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Currently published identity.
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.auth.current()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        let identity = {
            let accounts = self.accounts.lock().expect("accounts lock");
            match accounts.get(email) {
                Some((expected, identity)) if expected == password.expose_secret() => {
                    identity.clone()
                }
                _ => return Err(IdentityError::InvalidCredentials),
            }
        };
        self.auth.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in_with_idp(
        &self,
        provider_id: &str,
        id_token: &SecretString,
    ) -> Result<Identity, IdentityError> {
        let local = id_token.expose_secret();
        if local.is_empty() {
            return Err(IdentityError::InvalidCredentials);
        }
        let identity = Identity {
            id: format!("{provider_id}:{local}"),
            email: Some(email(&format!("{local}@federated.example.com"))),
            display_name: None,
            photo_url: None,
        };
        self.auth.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        display_name: Option<&str>,
    ) -> Result<Identity, IdentityError> {
        let identity = {
            let mut accounts = self.accounts.lock().expect("accounts lock");
            if accounts.contains_key(email) {
                return Err(IdentityError::EmailExists);
            }
            let identity = Identity {
                id: format!("uid-{}", email.local_part()),
                email: Some(email.clone()),
                display_name: display_name.map(ToString::to_string),
                photo_url: None,
            };
            accounts.insert(
                email.clone(),
                (password.expose_secret().to_string(), identity.clone()),
            );
            identity
        };
        self.auth.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(IdentityError::Rejected {
                code: 503,
                message: "UNAVAILABLE".to_string(),
            });
        }
        self.auth.publish(None);
        Ok(())
    }

    async fn send_password_reset(&self, _email: &Email) -> Result<(), IdentityError> {
        Ok(())
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity, IdentityError> {
        let mut identity = self.auth.current().ok_or(IdentityError::NotSignedIn)?;
        if let Some(name) = &update.display_name {
            identity.display_name = Some(name.clone());
        }
        if let Some(url) = &update.photo_url {
            identity.photo_url = Some(url.clone());
        }
        self.auth.publish(Some(identity.clone()));
        Ok(identity)
    }

    fn subscribe(&self) -> BoxStream<'static, Option<Identity>> {
        self.auth.stream()
    }
}

// =============================================================================
// Backend
// =============================================================================

/// In-memory user directory.
#[derive(Default)]
pub struct FakeDirectory {
    users: Mutex<BTreeMap<Email, UserRecord>>,
    hang: AtomicBool,
    fail: AtomicBool,
    fail_writes: AtomicBool,
    delay_ms: AtomicU64,
}

impl FakeDirectory {
    /// Insert or replace a record.
    pub fn insert(&self, record: UserRecord) {
        self.users
            .lock()
            .expect("users lock")
            .insert(record.email.clone(), record);
    }

    /// Stored record for `raw_email`.
    #[must_use]
    pub fn get(&self, raw_email: &str) -> Option<UserRecord> {
        self.users
            .lock()
            .expect("users lock")
            .get(&email(raw_email))
            .cloned()
    }

    /// Make lookups never complete.
    pub fn hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    /// Make lookups fail with a server error.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Delay every call by `delay`.
    pub fn delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Make creates and updates fail while reads keep working.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    async fn check_write(&self) -> Result<(), BackendError> {
        self.check().await?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Api {
                status: 500,
                message: "write refused".to_string(),
            });
        }
        Ok(())
    }

    async fn check(&self) -> Result<(), BackendError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.hang.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(BackendError::Api {
                status: 500,
                message: "boom".to_string(),
            });
        }
        Ok(())
    }

    fn update(
        &self,
        email: &Email,
        apply: impl FnOnce(&mut UserRecord),
    ) -> Result<(), BackendError> {
        let mut users = self.users.lock().expect("users lock");
        let record = users
            .get_mut(email)
            .ok_or_else(|| BackendError::NotFound(format!("/users/{email}")))?;
        apply(record);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for FakeDirectory {
    async fn get_user(&self, email: &Email) -> Result<Option<UserRecord>, BackendError> {
        self.check().await?;
        Ok(self.users.lock().expect("users lock").get(email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, BackendError> {
        self.check().await?;
        Ok(self
            .users
            .lock()
            .expect("users lock")
            .values()
            .cloned()
            .collect())
    }

    async fn create_user(&self, record: &UserRecord) -> Result<(), BackendError> {
        self.check_write().await?;
        self.insert(record.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        email: &Email,
        update: &StatusUpdate,
    ) -> Result<(), BackendError> {
        self.check_write().await?;
        self.update(email, |record| {
            record.status = Some(update.status);
            record.suspend_reason.clone_from(&update.suspend_reason);
        })
    }

    async fn assign_manager(
        &self,
        email: &Email,
        assignment: &ManagerAssignment,
    ) -> Result<(), BackendError> {
        self.check_write().await?;
        self.update(email, |record| assignment.clone().apply(record))
    }
}

/// In-memory order book.
#[derive(Default)]
pub struct FakeOrderBook {
    orders: Mutex<Vec<Order>>,
    tracking: Mutex<HashMap<String, Vec<TrackingUpdate>>>,
}

impl FakeOrderBook {
    /// Add a pending order.
    pub fn add_order(&self, id: &str, buyer: &str, product: &str) {
        self.orders.lock().expect("orders lock").push(Order {
            id: id.to_string(),
            product_name: product.to_string(),
            quantity: 100,
            buyer_email: email(buyer),
            status: OrderStatus::Pending,
            paid: false,
            created_at: None,
        });
    }

    /// Add a tracking update to `order_id`.
    pub fn add_tracking(&self, order_id: &str, stage: &str, at: &str) {
        self.tracking
            .lock()
            .expect("tracking lock")
            .entry(order_id.to_string())
            .or_default()
            .push(TrackingUpdate {
                stage: stage.to_string(),
                location: None,
                note: None,
                at: at.parse().expect("valid RFC 3339 timestamp"),
            });
    }

    /// Status of `order_id`.
    #[must_use]
    pub fn status(&self, order_id: &str) -> Option<OrderStatus> {
        self.orders
            .lock()
            .expect("orders lock")
            .iter()
            .find(|order| order.id == order_id)
            .map(|order| order.status.clone())
    }

    fn set_status(&self, order_id: &str, status: OrderStatus) -> Result<(), BackendError> {
        let mut orders = self.orders.lock().expect("orders lock");
        let order = orders
            .iter_mut()
            .find(|order| order.id == order_id)
            .ok_or_else(|| BackendError::NotFound(format!("/orders/{order_id}")))?;
        order.status = status;
        Ok(())
    }
}

#[async_trait]
impl OrderBook for FakeOrderBook {
    async fn orders_for_buyer(&self, buyer: &Email) -> Result<Vec<Order>, BackendError> {
        Ok(self
            .orders
            .lock()
            .expect("orders lock")
            .iter()
            .filter(|order| &order.buyer_email == buyer)
            .cloned()
            .collect())
    }

    async fn pending_orders(&self) -> Result<Vec<Order>, BackendError> {
        Ok(self
            .orders
            .lock()
            .expect("orders lock")
            .iter()
            .filter(|order| order.status == OrderStatus::Pending)
            .cloned()
            .collect())
    }

    async fn approve_order(&self, order_id: &str) -> Result<(), BackendError> {
        self.set_status(order_id, OrderStatus::Approved)
    }

    async fn reject_order(&self, order_id: &str) -> Result<(), BackendError> {
        self.set_status(order_id, OrderStatus::Rejected)
    }

    async fn tracking(&self, order_id: &str) -> Result<Vec<TrackingUpdate>, BackendError> {
        let mut updates = self
            .tracking
            .lock()
            .expect("tracking lock")
            .get(order_id)
            .cloned()
            .unwrap_or_default();
        updates.sort_by_key(|update| update.at);
        Ok(updates)
    }

    async fn stats(&self) -> Result<DashboardStats, BackendError> {
        let orders = self.orders.lock().expect("orders lock");
        Ok(DashboardStats {
            total_users: 0,
            total_products: 0,
            total_orders: orders.len() as u64,
            pending_orders: orders
                .iter()
                .filter(|order| order.status == OrderStatus::Pending)
                .count() as u64,
        })
    }
}

// =============================================================================
// Test App
// =============================================================================

/// Password of every account created by [`TestApp::sign_in_as`].
pub const TEST_PASSWORD: &str = "hunter22";

/// Configuration for tests; the URLs are never contacted.
#[must_use]
pub fn test_config(decision_timeout: Duration) -> DashboardConfig {
    DashboardConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3002,
        base_url: "http://localhost:3002".to_string(),
        identity: IdentityConfig {
            api_url: "http://identity.invalid/v1".to_string(),
            api_key: SecretString::from("test-key"),
        },
        backend: BackendConfig {
            api_url: "http://backend.invalid".to_string(),
            api_token: None,
        },
        guards: GuardConfig {
            role_fetch_attempts: 3,
            decision_timeout,
        },
        json_logs: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Response captured by [`TestApp`].
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HashMap<String, String>,
    pub location: Option<String>,
    pub cookie: Option<String>,
    pub body: String,
}

/// The dashboard router wired to in-memory fakes.
pub struct TestApp {
    pub state: AppState,
    pub identity: Arc<FakeIdentityProvider>,
    pub users: Arc<FakeDirectory>,
    pub orders: Arc<FakeOrderBook>,
    router: Router,
}

impl TestApp {
    /// App with a one-second decision budget.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(1))
    }

    /// App with the given decision budget.
    #[must_use]
    pub fn with_timeout(decision_timeout: Duration) -> Self {
        let identity = Arc::new(FakeIdentityProvider::default());
        let users = Arc::new(FakeDirectory::default());
        let orders = Arc::new(FakeOrderBook::default());

        let state = AppState::new(
            test_config(decision_timeout),
            identity.clone(),
            users.clone(),
            orders.clone(),
        );
        let router = routes::app(state.clone());

        Self {
            state,
            identity,
            users,
            orders,
            router,
        }
    }

    /// Store `record` in the backend and sign its identity in through the
    /// login form.
    ///
    /// Returns the session cookie of the signed-in browser.
    pub async fn sign_in_as(&self, record: UserRecord) -> String {
        let identity = identity_for(&record);
        self.users.insert(record);
        self.sign_in_identity(identity).await
    }

    /// Sign `identity` in through the login form without a backend record.
    ///
    /// Returns the session cookie of the signed-in browser.
    pub async fn sign_in_identity(&self, identity: Identity) -> String {
        let email = identity.email.clone().expect("identity needs an email");
        self.identity.add_account(identity, TEST_PASSWORD);

        let form = format!(
            "email={}&password={TEST_PASSWORD}",
            email.as_str().replace('@', "%40")
        );
        let resp = self.post_form("/auth/login", &form, None).await;
        assert_eq!(
            resp.location.as_deref(),
            Some("/dashboard"),
            "sign-in for {email} failed"
        );
        resp.cookie.expect("sign-in issues a session cookie")
    }

    /// Publish an auth-state change and wait for the session store to
    /// observe it.
    pub async fn publish(&self, identity: Option<Identity>) {
        let expected = identity.clone();
        self.identity.publish(identity);
        self.state
            .session()
            .wait_until(Duration::from_secs(1), move |state| {
                !state.loading && state.identity == expected
            })
            .await
            .expect("session store did not observe the change");
    }

    /// GET `path`, optionally sending a session cookie.
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        let mut request = Request::builder().method("GET").uri(path);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).expect("valid request"))
            .await
    }

    /// POST a urlencoded form to `path`.
    pub async fn post_form(&self, path: &str, form: &str, cookie: Option<&str>) -> TestResponse {
        let mut request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::from(form.to_string())).expect("valid request"))
            .await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let location = headers.get(header::LOCATION.as_str()).cloned();
        let cookie = headers
            .get(header::SET_COOKIE.as_str())
            .and_then(|raw| raw.split(';').next().map(ToString::to_string));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");

        TestResponse {
            status,
            headers,
            location,
            cookie,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
