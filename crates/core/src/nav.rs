//! Navigation menu for the dashboard shell.
//!
//! The menu is a static list filtered by role. Filtering only decides what
//! is shown; the page guards decide what is reachable.

use crate::Role;

/// Who a navigation entry is shown to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every signed-in user, including accounts without a resolved role.
    Everyone,
    /// Managers and admins.
    Staff,
    /// Admins only.
    Admin,
}

impl Audience {
    /// Whether an account with `role` sees entries for this audience.
    #[must_use]
    pub fn includes(self, role: Option<Role>) -> bool {
        match self {
            Self::Everyone => true,
            Self::Staff => role.is_some_and(Role::is_staff),
            Self::Admin => role == Some(Role::Admin),
        }
    }
}

/// One entry of the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavLink {
    /// Visible label.
    pub label: &'static str,
    /// Target route.
    pub href: &'static str,
    /// Who sees it.
    pub audience: Audience,
}

impl NavLink {
    /// Whether `path` is this entry or one of its sub-pages.
    #[must_use]
    pub fn is_active(&self, path: &str) -> bool {
        path == self.href
            || (self.href != "/dashboard"
                && path
                    .strip_prefix(self.href)
                    .is_some_and(|rest| rest.starts_with('/')))
    }
}

/// Every navigation entry, in display order.
pub const LINKS: &[NavLink] = &[
    NavLink {
        label: "Overview",
        href: "/dashboard",
        audience: Audience::Everyone,
    },
    NavLink {
        label: "My Orders",
        href: "/dashboard/my-orders",
        audience: Audience::Everyone,
    },
    NavLink {
        label: "Pending Orders",
        href: "/dashboard/orders/pending",
        audience: Audience::Staff,
    },
    NavLink {
        label: "Manage Users",
        href: "/dashboard/users",
        audience: Audience::Admin,
    },
    NavLink {
        label: "Profile",
        href: "/dashboard/profile",
        audience: Audience::Everyone,
    },
];

/// Entries visible to an account with `role`.
#[must_use]
pub fn links_for(role: Option<Role>) -> Vec<&'static NavLink> {
    LINKS
        .iter()
        .filter(|link| link.audience.includes(role))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hrefs(role: Option<Role>) -> Vec<&'static str> {
        links_for(role).iter().map(|l| l.href).collect()
    }

    #[test]
    fn test_buyer_sees_base_set() {
        assert_eq!(
            hrefs(Some(Role::Buyer)),
            vec!["/dashboard", "/dashboard/my-orders", "/dashboard/profile"]
        );
        assert_eq!(hrefs(None), hrefs(Some(Role::Buyer)));
    }

    #[test]
    fn test_staff_menus_are_supersets_of_buyer_menu() {
        let base = hrefs(Some(Role::Buyer));
        for role in [Role::Manager, Role::Admin] {
            let menu = hrefs(Some(role));
            assert!(base.iter().all(|href| menu.contains(href)), "{role}");
            assert!(menu.len() > base.len(), "{role}");
        }
    }

    #[test]
    fn test_role_specific_entries() {
        assert!(hrefs(Some(Role::Manager)).contains(&"/dashboard/orders/pending"));
        assert!(!hrefs(Some(Role::Manager)).contains(&"/dashboard/users"));
        assert!(hrefs(Some(Role::Admin)).contains(&"/dashboard/users"));
    }

    #[test]
    fn test_is_active() {
        let overview = LINKS.first().copied();
        let users = LINKS.iter().find(|l| l.href == "/dashboard/users").copied();
        let (Some(overview), Some(users)) = (overview, users) else {
            panic!("links missing");
        };

        assert!(overview.is_active("/dashboard"));
        assert!(!overview.is_active("/dashboard/users"));
        assert!(users.is_active("/dashboard/users"));
        assert!(users.is_active("/dashboard/users/a@b.co/suspend"));
        assert!(!users.is_active("/dashboard/usersx"));
    }
}
