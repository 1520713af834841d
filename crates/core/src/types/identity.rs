//! Authenticated principal as reported by the identity provider.

use serde::{Deserialize, Serialize};

use super::Email;

/// Read-only mirror of the identity provider's user.
///
/// Created on sign-in, dropped on sign-out. `email` is optional because
/// federated accounts are not guaranteed to expose one; role resolution is
/// skipped for such identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Provider-assigned user ID.
    pub id: String,
    /// Account email, when the provider knows one.
    pub email: Option<Email>,
    /// Display name shown in the dashboard header.
    pub display_name: Option<String>,
    /// Avatar URL.
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl Identity {
    /// Name to greet the user with: display name, else the email local part.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.email.as_ref().map(Email::local_part))
            .unwrap_or("there")
    }
}
