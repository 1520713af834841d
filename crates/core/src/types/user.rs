//! Backend-owned user records.

use serde::{Deserialize, Serialize};

use super::{AccountStatus, Email, Role, role, status};

/// Authorization metadata for one account, keyed by email.
///
/// `role` and `status` are `None` when the backend sends nothing or a value
/// outside the known set. Guards treat a missing role as "not staff" and a
/// missing status as "not suspended".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Record key.
    pub email: Email,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Account role.
    #[serde(default, with = "role::lenient")]
    pub role: Option<Role>,
    /// Lifecycle status.
    #[serde(default, with = "status::lenient")]
    pub status: Option<AccountStatus>,
    /// Production unit this account manages, if assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_for: Option<String>,
    /// Reason recorded when the account was suspended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspend_reason: Option<String>,
}

impl UserRecord {
    /// A fresh self-registered account: Buyer, pending activation.
    #[must_use]
    pub const fn new_buyer(email: Email, name: String) -> Self {
        Self {
            email,
            name,
            role: Some(Role::Buyer),
            status: Some(AccountStatus::Pending),
            manager_for: None,
            suspend_reason: None,
        }
    }

    /// Whether the `IsAdminManager` guard lets this account through.
    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.role.is_some_and(Role::is_staff)
    }

    /// Whether the `IsSuspended` guard redirects this account.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.status == Some(AccountStatus::Suspended)
    }

    /// Whether this record is an Admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    /// The change produced by pressing "assign manager" on this record.
    ///
    /// The action is a toggle: an assigned record is unassigned, an
    /// unassigned one is assigned to `unit`.
    #[must_use]
    pub fn toggle_manager(&self, unit: &str) -> ManagerAssignment {
        match self.manager_for {
            Some(_) => ManagerAssignment { manager_for: None },
            None => ManagerAssignment {
                manager_for: Some(unit.trim().to_string()),
            },
        }
    }

    /// Actions the user management page may offer for this record.
    #[must_use]
    pub fn actions(&self) -> UserActions {
        UserActions::for_record(self)
    }
}

/// Body of a manager assignment update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerAssignment {
    /// New value for `managerFor`; `None` clears it.
    pub manager_for: Option<String>,
}

impl ManagerAssignment {
    /// Apply the assignment to a record in place.
    pub fn apply(self, record: &mut UserRecord) {
        record.manager_for = self.manager_for;
    }
}

/// Which account actions are enabled for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct UserActions {
    /// Move to `active` (activation or reactivation).
    pub activate: bool,
    /// Move to `suspended`. Never enabled for Admin records.
    pub suspend: bool,
    /// Toggle `managerFor`.
    pub toggle_manager: bool,
}

impl UserActions {
    /// Compute the enabled actions for `record`.
    #[must_use]
    pub fn for_record(record: &UserRecord) -> Self {
        let status = record.status.unwrap_or_default();
        Self {
            activate: status.can_transition_to(AccountStatus::Active),
            suspend: !record.is_admin() && status.can_transition_to(AccountStatus::Suspended),
            toggle_manager: !record.is_admin(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(role: Option<Role>, status: Option<AccountStatus>) -> UserRecord {
        UserRecord {
            email: Email::parse("someone@example.com").unwrap(),
            name: "Someone".to_string(),
            role,
            status,
            manager_for: None,
            suspend_reason: None,
        }
    }

    #[test]
    fn test_deserialize_backend_shape() {
        let json = serde_json::json!({
            "email": "lead@factory.example",
            "name": "Line Lead",
            "role": "Manager",
            "status": "active",
            "managerFor": "Line 3"
        });
        let rec: UserRecord = serde_json::from_value(json).unwrap();
        assert_eq!(rec.role, Some(Role::Manager));
        assert_eq!(rec.status, Some(AccountStatus::Active));
        assert_eq!(rec.manager_for.as_deref(), Some("Line 3"));
        assert_eq!(rec.suspend_reason, None);
    }

    #[test]
    fn test_deserialize_unknown_values_become_none() {
        let json = serde_json::json!({
            "email": "x@example.com",
            "role": "",
            "status": "archived"
        });
        let rec: UserRecord = serde_json::from_value(json).unwrap();
        assert_eq!(rec.role, None);
        assert_eq!(rec.status, None);
        assert!(!rec.is_staff());
        assert!(!rec.is_suspended());
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let rec = UserRecord::new_buyer(Email::parse("new@example.com").unwrap(), "New".into());
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["role"], "Buyer");
        assert_eq!(value["status"], "pending");
        assert!(value.get("managerFor").is_none());
    }

    #[test]
    fn test_suspend_never_enabled_for_admin() {
        for status in [
            None,
            Some(AccountStatus::Pending),
            Some(AccountStatus::Active),
            Some(AccountStatus::Suspended),
        ] {
            let actions = record(Some(Role::Admin), status).actions();
            assert!(!actions.suspend, "admin with status {status:?}");
            assert!(!actions.toggle_manager);
        }
    }

    #[test]
    fn test_actions_follow_lifecycle() {
        let active = record(Some(Role::Buyer), Some(AccountStatus::Active)).actions();
        assert!(active.suspend);
        assert!(!active.activate);

        let suspended = record(Some(Role::Manager), Some(AccountStatus::Suspended)).actions();
        assert!(suspended.activate);
        assert!(!suspended.suspend);

        let pending = record(Some(Role::Buyer), None).actions();
        assert!(pending.activate);
        assert!(!pending.suspend);
    }

    #[test]
    fn test_manager_toggle_twice_round_trips() {
        let mut rec = record(Some(Role::Manager), Some(AccountStatus::Active));

        rec.toggle_manager("Line 3").apply(&mut rec);
        assert_eq!(rec.manager_for.as_deref(), Some("Line 3"));

        rec.toggle_manager("Line 3").apply(&mut rec);
        assert_eq!(rec.manager_for, None);
    }
}
