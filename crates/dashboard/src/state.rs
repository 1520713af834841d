//! Application state shared across handlers.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::backend::{BackendClient, BackendError, OrderBook, UserDirectory};
use crate::config::DashboardConfig;
use crate::identity::{IdentityError, IdentityProvider, RestIdentityProvider};
use crate::resolver::RoleResolver;
use crate::session::SessionStore;

/// Error creating the application state from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("identity provider client: {0}")]
    Identity(#[from] IdentityError),
    #[error("backend client: {0}")]
    Backend(#[from] BackendError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Owns the session store and the task that
/// feeds it; dropping the last clone tears the subscription down.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DashboardConfig,
    session: SessionStore,
    identity: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserDirectory>,
    orders: Arc<dyn OrderBook>,
    resolver: RoleResolver,
    observer: JoinHandle<()>,
}

impl Drop for AppStateInner {
    fn drop(&mut self) {
        self.observer.abort();
    }
}

impl AppState {
    /// Assemble the state from its collaborators and start observing the
    /// identity provider's auth state.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(
        config: DashboardConfig,
        identity: Arc<dyn IdentityProvider>,
        users: Arc<dyn UserDirectory>,
        orders: Arc<dyn OrderBook>,
    ) -> Self {
        let session = SessionStore::new();
        let observer = session.observe(identity.subscribe());
        let resolver = RoleResolver::new(Arc::clone(&users), &config.guards);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                session,
                identity,
                users,
                orders,
                resolver,
                observer,
            }),
        }
    }

    /// Build the HTTP-backed state described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client cannot be built.
    pub fn from_config(config: DashboardConfig) -> Result<Self, StateError> {
        let identity = Arc::new(RestIdentityProvider::new(&config.identity, &config.base_url)?);
        let backend = Arc::new(BackendClient::new(&config.backend)?);

        Ok(Self::new(config, identity, backend.clone(), backend))
    }

    /// Get a reference to the dashboard configuration.
    #[must_use]
    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    /// The process-wide session store.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// The identity provider.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    /// Backend user records.
    #[must_use]
    pub fn users(&self) -> &dyn UserDirectory {
        self.inner.users.as_ref()
    }

    /// Backend orders.
    #[must_use]
    pub fn orders(&self) -> &dyn OrderBook {
        self.inner.orders.as_ref()
    }

    /// The guard-facing role resolver.
    #[must_use]
    pub fn resolver(&self) -> &RoleResolver {
        &self.inner.resolver
    }
}
