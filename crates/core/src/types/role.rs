//! Account roles.

use serde::{Deserialize, Serialize};

/// Error returned when a role string is not one of the known roles.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0:?}")]
pub struct RoleParseError(pub String);

/// Role carried by a backend user record.
///
/// The backend stores roles capitalized (`"Buyer"`, `"Manager"`, `"Admin"`).
/// Parsing accepts any casing; anything else is not a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Places orders and follows their tracking.
    Buyer,
    /// Runs production: products, order approval, tracking updates.
    Manager,
    /// Manages user accounts. Once a record is Admin it stays Admin.
    Admin,
}

impl Role {
    /// All roles, lowest privilege first.
    pub const ALL: [Self; 3] = [Self::Buyer, Self::Manager, Self::Admin];

    /// Whether this role passes the `IsAdminManager` guard.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        match self {
            Self::Manager | Self::Admin => true,
            Self::Buyer => false,
        }
    }

    /// Canonical wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "Buyer",
            Self::Manager => "Manager",
            Self::Admin => "Admin",
        }
    }

    /// Lenient conversion used for backend data: unknown values become `None`.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buyer" => Ok(Self::Buyer),
            "manager" => Ok(Self::Manager),
            "admin" => Ok(Self::Admin),
            _ => Err(RoleParseError(s.to_string())),
        }
    }
}

/// Serde adapter for an optional role field that tolerates unknown strings.
///
/// `null`, a missing field, `""` and unknown values all become `None`.
pub mod lenient {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Role;

    /// Serialize an optional role as its wire name (or `null`).
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S>(role: &Option<Role>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match role {
            Some(role) => serializer.serialize_str(role.as_str()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional role, mapping unknown strings to `None`.
    ///
    /// # Errors
    ///
    /// Fails only when the value is neither a string nor `null`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(Role::from_wire))
    }
}
