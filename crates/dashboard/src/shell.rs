//! Dashboard shell: header and role-filtered navigation around every page.

use ordertrack_core::nav;
use ordertrack_core::{Identity, Role, UserRecord};

use crate::notices::Notice;

/// Navigation entry prepared for templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub href: &'static str,
    pub active: bool,
}

/// Everything the shared layout renders around a page body.
#[derive(Debug, Clone)]
pub struct ShellView {
    /// Name shown in the header greeting.
    pub greeting: String,
    /// Account email, empty for federated identities without one.
    pub email: String,
    /// Avatar URL, if the identity has one.
    pub photo_url: Option<String>,
    /// Resolved role label, or "Member" when no record was found.
    pub role_label: &'static str,
    /// Entries visible to the resolved role.
    pub nav: Vec<NavItem>,
    /// Path of the current page.
    pub current_path: String,
    /// One-shot notices to show above the page body.
    pub notices: Vec<Notice>,
}

impl ShellView {
    /// Build the shell for `identity`, with the menu restricted to the role
    /// in `record`.
    #[must_use]
    pub fn new(
        identity: &Identity,
        record: Option<&UserRecord>,
        current_path: &str,
        notices: Vec<Notice>,
    ) -> Self {
        let role = record.and_then(|r| r.role);
        let nav = nav::links_for(role)
            .into_iter()
            .map(|link| NavItem {
                label: link.label,
                href: link.href,
                active: link.is_active(current_path),
            })
            .collect();

        Self {
            greeting: identity.greeting_name().to_string(),
            email: identity
                .email
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            photo_url: identity.photo_url.clone(),
            role_label: role.map_or("Member", Role::as_str),
            nav,
            current_path: current_path.to_string(),
            notices,
        }
    }

    /// Whether the resolved role sees staff entries.
    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.role_label == Role::Manager.as_str() || self.role_label == Role::Admin.as_str()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ordertrack_core::Email;

    use super::*;

    fn identity() -> Identity {
        Identity {
            id: "uid-1".to_string(),
            email: Some(Email::parse("ada@example.com").unwrap()),
            display_name: Some("Ada".to_string()),
            photo_url: None,
        }
    }

    fn record(role: Role) -> UserRecord {
        let mut record = UserRecord::new_buyer(Email::parse("ada@example.com").unwrap(), "Ada".to_string());
        record.role = Some(role);
        record
    }

    fn labels(shell: &ShellView) -> Vec<&'static str> {
        shell.nav.iter().map(|item| item.label).collect()
    }

    #[test]
    fn test_buyer_sees_base_menu() {
        let shell = ShellView::new(&identity(), Some(&record(Role::Buyer)), "/dashboard", vec![]);
        assert_eq!(labels(&shell), vec!["Overview", "My Orders", "Profile"]);
        assert_eq!(shell.role_label, "Buyer");
        assert!(!shell.is_staff());
    }

    #[test]
    fn test_manager_and_admin_menus_are_supersets() {
        let manager = ShellView::new(&identity(), Some(&record(Role::Manager)), "/dashboard", vec![]);
        let admin = ShellView::new(&identity(), Some(&record(Role::Admin)), "/dashboard", vec![]);

        assert!(labels(&manager).contains(&"Pending Orders"));
        assert!(!labels(&manager).contains(&"Manage Users"));
        assert!(labels(&admin).contains(&"Manage Users"));
        for label in labels(&manager) {
            assert!(labels(&admin).contains(&label));
        }
    }

    #[test]
    fn test_missing_record_gets_base_menu() {
        let shell = ShellView::new(&identity(), None, "/dashboard/profile", vec![]);
        assert_eq!(shell.role_label, "Member");
        let active: Vec<_> = shell.nav.iter().filter(|i| i.active).map(|i| i.label).collect();
        assert_eq!(active, vec!["Profile"]);
    }
}
