//! Identity provider integration.
//!
//! Authentication is delegated to an external provider. [`IdentityProvider`]
//! covers the operations the dashboard needs plus an auth-state subscription
//! that feeds the [`SessionStore`](crate::session::SessionStore).
//! [`RestIdentityProvider`] implements it over the Identity Toolkit REST API.

mod error;
mod rest;

pub use error::{IdentityError, ProviderError, ProviderErrorResponse};
pub use rest::RestIdentityProvider;

use async_trait::async_trait;
use futures::stream::BoxStream;
use secrecy::SecretString;
use tokio::sync::watch;

use ordertrack_core::{Email, Identity};

/// Profile fields a signed-in user may change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// New display name; `None` leaves it unchanged.
    pub display_name: Option<String>,
    /// New avatar URL; `None` leaves it unchanged.
    pub photo_url: Option<String>,
}

impl ProfileUpdate {
    /// Build an update from raw form input, dropping blank fields.
    #[must_use]
    pub fn from_form(display_name: &str, photo_url: &str) -> Self {
        let keep = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        Self {
            display_name: keep(display_name),
            photo_url: keep(photo_url),
        }
    }

    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.photo_url.is_none()
    }
}

/// Operations delegated to the identity provider.
///
/// Successful sign-in, sign-up and sign-out calls also publish the new
/// identity (or `None`) to every [`subscribe`](Self::subscribe) stream.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in with email and password.
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, IdentityError>;

    /// Exchange a federated IdP token (e.g. a Google ID token) for a session.
    async fn sign_in_with_idp(
        &self,
        provider_id: &str,
        id_token: &SecretString,
    ) -> Result<Identity, IdentityError>;

    /// Create an account and sign it in.
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        display_name: Option<&str>,
    ) -> Result<Identity, IdentityError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Send a password reset email.
    async fn send_password_reset(&self, email: &Email) -> Result<(), IdentityError>;

    /// Update the signed-in user's profile.
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity, IdentityError>;

    /// Auth-state notifications: the current identity first, then every change.
    fn subscribe(&self) -> BoxStream<'static, Option<Identity>>;
}

/// Broadcast of the current identity to auth-state subscribers.
///
/// Subscribers see the current value immediately and every later change;
/// changes published faster than a subscriber polls collapse to the latest.
#[derive(Debug)]
pub struct AuthStateChannel {
    tx: watch::Sender<Option<Identity>>,
}

impl AuthStateChannel {
    /// Create a channel with no identity.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Publish a new identity (or sign-out).
    pub fn publish(&self, identity: Option<Identity>) {
        self.tx.send_replace(identity);
    }

    /// The identity most recently published.
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    /// Stream of auth-state notifications.
    #[must_use]
    pub fn stream(&self) -> BoxStream<'static, Option<Identity>> {
        let mut rx = self.tx.subscribe();
        Box::pin(async_stream::stream! {
            let initial = rx.borrow_and_update().clone();
            yield initial;
            while rx.changed().await.is_ok() {
                let next = rx.borrow_and_update().clone();
                yield next;
            }
        })
    }
}

impl Default for AuthStateChannel {
    fn default() -> Self {
        Self::new()
    }
}
