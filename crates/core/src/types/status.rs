//! Account status and its lifecycle.
//!
//! ```text
//! pending ──activate──▶ active ──suspend──▶ suspended
//!                          ▲                    │
//!                          └─────reactivate─────┘
//! ```

use serde::{Deserialize, Serialize};

use super::Role;

/// Error returned when a status string is not one of the known statuses.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid account status: {0:?}")]
pub struct StatusParseError(pub String);

/// Error returned when a requested status change is not allowed.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransitionError {
    /// The lifecycle has no edge between these states.
    #[error("cannot move an account from {from} to {to}")]
    NotAllowed {
        /// Current status.
        from: AccountStatus,
        /// Requested status.
        to: AccountStatus,
    },
    /// Admin accounts cannot be suspended.
    #[error("admin accounts cannot be suspended")]
    AdminNotSuspendable,
}

/// Lifecycle status of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Registered, awaiting activation.
    #[default]
    Pending,
    /// Normal access.
    Active,
    /// Blocked by an administrator; the `IsSuspended` guard redirects.
    Suspended,
}

impl AccountStatus {
    /// Canonical wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }

    /// Lenient conversion used for backend data: unknown values become `None`.
    ///
    /// Matching is case-insensitive, so `"Suspended"` and `"SUSPENDED"` are
    /// both [`AccountStatus::Suspended`].
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        value.parse().ok()
    }

    /// Whether the lifecycle has an edge from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending | Self::Suspended, Self::Active) | (Self::Active, Self::Suspended)
        )
    }

    /// Validate a status change for an account holding `role`.
    ///
    /// # Errors
    ///
    /// Returns [`StatusTransitionError::AdminNotSuspendable`] when suspending
    /// an admin, and [`StatusTransitionError::NotAllowed`] for any change the
    /// lifecycle does not permit.
    pub fn transition_to(
        self,
        next: Self,
        role: Option<Role>,
    ) -> Result<Self, StatusTransitionError> {
        if next == Self::Suspended && role == Some(Role::Admin) {
            return Err(StatusTransitionError::AdminNotSuspendable);
        }
        if !self.can_transition_to(next) {
            return Err(StatusTransitionError::NotAllowed {
                from: self,
                to: next,
            });
        }
        Ok(next)
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}

/// Serde adapter for an optional status field that tolerates unknown strings.
pub mod lenient {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::AccountStatus;

    /// Serialize an optional status as its wire name (or `null`).
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S>(status: &Option<AccountStatus>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match status {
            Some(status) => serializer.serialize_str(status.as_str()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional status, mapping unknown strings to `None`.
    ///
    /// # Errors
    ///
    /// Fails only when the value is neither a string nor `null`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<AccountStatus>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(AccountStatus::from_wire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_wire_is_case_insensitive() {
        assert_eq!(
            AccountStatus::from_wire("suspended"),
            Some(AccountStatus::Suspended)
        );
        assert_eq!(
            AccountStatus::from_wire("Suspended"),
            Some(AccountStatus::Suspended)
        );
        assert_eq!(
            AccountStatus::from_wire("SUSPENDED"),
            Some(AccountStatus::Suspended)
        );
        assert_eq!(AccountStatus::from_wire("banned"), None);
        assert_eq!(AccountStatus::from_wire(""), None);
    }

    #[test]
    fn test_lifecycle_edges() {
        use AccountStatus::{Active, Pending, Suspended};

        assert!(Pending.can_transition_to(Active));
        assert!(Active.can_transition_to(Suspended));
        assert!(Suspended.can_transition_to(Active));

        assert!(!Pending.can_transition_to(Suspended));
        assert!(!Active.can_transition_to(Pending));
        assert!(!Suspended.can_transition_to(Pending));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn test_admin_cannot_be_suspended() {
        assert_eq!(
            AccountStatus::Active.transition_to(AccountStatus::Suspended, Some(Role::Admin)),
            Err(StatusTransitionError::AdminNotSuspendable)
        );
        assert_eq!(
            AccountStatus::Active.transition_to(AccountStatus::Suspended, Some(Role::Manager)),
            Ok(AccountStatus::Suspended)
        );
    }

    #[test]
    fn test_transition_not_allowed() {
        let err = AccountStatus::Pending
            .transition_to(AccountStatus::Suspended, Some(Role::Buyer))
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot move an account from pending to suspended");
    }
}
