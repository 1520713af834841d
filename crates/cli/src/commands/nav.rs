//! Navigation listing.
//!
//! ```bash
//! ordertrack-cli nav admin
//! ```

use ordertrack_core::nav;
use ordertrack_core::{Role, RoleParseError};

/// Parse an optional role argument; `None` means "no resolved role".
///
/// # Errors
///
/// Returns `RoleParseError` for anything other than buyer, manager or admin.
pub fn parse_role(role: Option<&str>) -> Result<Option<Role>, RoleParseError> {
    role.map(str::parse).transpose()
}

/// Labels and routes visible to `role`, in menu order.
#[must_use]
pub fn entries(role: Option<Role>) -> Vec<(&'static str, &'static str)> {
    nav::links_for(role)
        .into_iter()
        .map(|link| (link.label, link.href))
        .collect()
}

/// Print the navigation for `role`.
///
/// # Errors
///
/// Returns `RoleParseError` for an unknown role.
pub fn run(role: Option<&str>) -> Result<(), RoleParseError> {
    let role = parse_role(role)?;

    tracing::info!(
        "Navigation for {}:",
        role.map_or("an account without a role", Role::as_str)
    );
    for (label, href) in entries(role) {
        tracing::info!("  {label:<16} {href}");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role(None).unwrap(), None);
        assert_eq!(parse_role(Some("Manager")).unwrap(), Some(Role::Manager));
        assert!(parse_role(Some("owner")).is_err());
    }

    #[test]
    fn test_entries_grow_with_role() {
        let buyer = entries(Some(Role::Buyer));
        let admin = entries(Some(Role::Admin));
        assert_eq!(entries(None), buyer);
        assert!(buyer.iter().all(|entry| admin.contains(entry)));
        assert!(admin.len() > buyer.len());
    }
}
