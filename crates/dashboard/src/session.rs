//! Process-wide session store.
//!
//! The dashboard serves one operator, so the signed-in identity is held once
//! per process. Requests only see it through a browser session bound at
//! sign-in (see [`crate::middleware::guard`]).
//!
//! The only writer is the auth-state consumer started by
//! [`SessionStore::observe`]; request handlers read snapshots or wait for the
//! first notification with [`SessionStore::wait_until_loaded`].

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use ordertrack_core::Identity;

use crate::identity::IdentityProvider;
use crate::notices::Notice;

/// Current identity plus the loading flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Signed-in identity; `None` is a normal signed-out state.
    pub identity: Option<Identity>,
    /// `true` until the first auth-state notification arrives.
    pub loading: bool,
}

impl SessionState {
    const fn initial() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }
}

/// Shared handle to the session state.
///
/// Cheap to clone; every clone observes the same state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<SessionState>>,
}

impl SessionStore {
    /// Create a store in the loading state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::initial());
        Self { tx: Arc::new(tx) }
    }

    /// Consume auth-state notifications until the stream ends.
    ///
    /// Each notification replaces the identity and clears `loading`. The
    /// returned task should be aborted when the store's owner is dropped.
    #[must_use]
    pub fn observe(&self, mut notifications: BoxStream<'static, Option<Identity>>) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            while let Some(identity) = notifications.next().await {
                store.apply(identity);
            }
            debug!("Auth-state subscription ended");
        })
    }

    /// Apply one notification; last write wins.
    fn apply(&self, identity: Option<Identity>) {
        debug!(
            signed_in = identity.is_some(),
            "Auth state changed"
        );
        self.tx.send_replace(SessionState {
            identity,
            loading: false,
        });
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Receiver that sees every later state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Wait for the first notification, up to `timeout`.
    ///
    /// Returns `None` if the store is still loading when the budget runs out.
    pub async fn wait_until_loaded(&self, timeout: Duration) -> Option<SessionState> {
        self.wait_until(timeout, |state| !state.loading).await
    }

    /// Wait until the state satisfies `ready`, up to `timeout`.
    ///
    /// Used after a sign-in to let the auth-state consumer catch up before
    /// redirecting to a guarded page.
    pub async fn wait_until(
        &self,
        timeout: Duration,
        ready: impl FnMut(&SessionState) -> bool + Send,
    ) -> Option<SessionState> {
        let mut rx = self.subscribe();
        let waited = tokio::time::timeout(timeout, async move {
            rx.wait_for(ready).await.map(|state| state.clone())
        })
        .await;

        match waited {
            Ok(Ok(state)) => Some(state),
            Ok(Err(_)) | Err(_) => None,
        }
    }

    /// Sign out through the provider.
    ///
    /// On success the identity is cleared locally right away, without waiting
    /// for the provider's notification. Failures are reported, not retried.
    pub async fn sign_out(&self, provider: &dyn IdentityProvider) -> Notice {
        match provider.sign_out().await {
            Ok(()) => {
                self.tx.send_modify(|state| {
                    state.identity = None;
                    state.loading = false;
                });
                info!("Signed out");
                Notice::success("You have been signed out.")
            }
            Err(e) => {
                warn!(error = %e, "Sign-out failed");
                Notice::error(format!("Sign-out failed: {e}"))
            }
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
