//! Account lookup.
//!
//! Runs the same resolver the dashboard guards use, so the output shows
//! what a guard would decide for this email right now.
//!
//! ```bash
//! BACKEND_API_URL=https://api.example.com ordertrack-cli whois buyer@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `BACKEND_API_URL` - Backend base URL (or `--backend-url`)
//! - `BACKEND_API_TOKEN` - Optional bearer token

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use ordertrack_core::guard::{self, Decision, Resolution};
use ordertrack_core::{Email, EmailError, UserRecord};
use ordertrack_dashboard::backend::{BackendClient, BackendError};
use ordertrack_dashboard::config::{BackendConfig, GuardConfig};
use ordertrack_dashboard::resolver::RoleResolver;

use super::nav;

/// Errors that can occur during a lookup.
#[derive(Debug, Error)]
pub enum WhoisError {
    /// The email argument is malformed.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The backend client could not be built.
    #[error("Backend client error: {0}")]
    Backend(#[from] BackendError),

    /// No decision within the retry policy.
    #[error("Lookup did not complete: {0}")]
    Unresolved(String),
}

/// Describe what the staff and suspension guards decide for `resolution`.
#[must_use]
pub fn describe(resolution: &Resolution) -> Vec<String> {
    let outcome = |decision: Decision| match decision {
        Decision::Render => "render".to_string(),
        Decision::Redirect(redirect) => format!("redirect to {}", redirect.to),
        Decision::Failed(failure) => format!("failed ({failure})"),
    };

    vec![
        format!(
            "staff pages: {}",
            outcome(guard::is_admin_manager(resolution).or_timed_out())
        ),
        format!(
            "suspension check: {}",
            outcome(guard::is_suspended(resolution).or_timed_out())
        ),
    ]
}

fn print_record(record: &UserRecord) {
    tracing::info!("Email:    {}", record.email);
    tracing::info!("Name:     {}", record.name);
    tracing::info!(
        "Role:     {}",
        record.role.map_or("(none)", |role| role.as_str())
    );
    tracing::info!(
        "Status:   {}",
        record.status.map_or("(none)", |status| status.as_str())
    );
    if let Some(unit) = &record.manager_for {
        tracing::info!("Manages:  {unit}");
    }
    if let Some(reason) = &record.suspend_reason {
        tracing::info!("Reason:   {reason}");
    }
}

/// Resolve `email` and print the record, guard outcomes and navigation.
///
/// # Errors
///
/// Returns `WhoisError` for a malformed email, an unusable backend
/// configuration, or a lookup that failed or timed out.
pub async fn run(
    email: &str,
    backend_url: &str,
    attempts: u32,
    timeout: Duration,
) -> Result<(), WhoisError> {
    let email = Email::parse(email)?;

    let backend = BackendConfig {
        api_url: backend_url.trim_end_matches('/').to_string(),
        api_token: std::env::var("BACKEND_API_TOKEN")
            .ok()
            .filter(|token| !token.is_empty())
            .map(SecretString::from),
    };
    let guards = GuardConfig {
        role_fetch_attempts: attempts,
        decision_timeout: timeout,
    };

    let client = BackendClient::new(&backend)?;
    let resolver = RoleResolver::new(Arc::new(client), &guards);

    tracing::info!("Resolving {email}...");
    let resolution = resolver.resolve(Some(&email)).await;

    match &resolution {
        Resolution::Resolved(record) => print_record(record),
        Resolution::Missing => tracing::warn!("No backend record for {email}"),
        Resolution::Failed(reason) => return Err(WhoisError::Unresolved(reason.clone())),
        Resolution::TimedOut => {
            return Err(WhoisError::Unresolved(format!(
                "timed out after {}ms",
                timeout.as_millis()
            )));
        }
        Resolution::Skipped | Resolution::InFlight => {}
    }

    for line in describe(&resolution) {
        tracing::info!("{line}");
    }

    tracing::info!("Navigation:");
    for (label, href) in nav::entries(resolution.record().and_then(|record| record.role)) {
        tracing::info!("  {label:<16} {href}");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ordertrack_core::{AccountStatus, Role};

    use super::*;

    fn record(role: Role, status: AccountStatus) -> UserRecord {
        let mut record = UserRecord::new_buyer(
            Email::parse("someone@example.com").unwrap(),
            "Someone".to_string(),
        );
        record.role = Some(role);
        record.status = Some(status);
        record
    }

    #[test]
    fn test_describe_manager() {
        let lines = describe(&Resolution::Resolved(record(
            Role::Manager,
            AccountStatus::Active,
        )));
        assert_eq!(lines, vec!["staff pages: render", "suspension check: render"]);
    }

    #[test]
    fn test_describe_suspended_buyer() {
        let lines = describe(&Resolution::Resolved(record(
            Role::Buyer,
            AccountStatus::Suspended,
        )));
        assert_eq!(
            lines,
            vec![
                "staff pages: redirect to /dashboard",
                "suspension check: redirect to /account-suspended",
            ]
        );
    }

    #[test]
    fn test_describe_missing_record() {
        let lines = describe(&Resolution::Missing);
        assert_eq!(
            lines,
            vec!["staff pages: redirect to /dashboard", "suspension check: render"]
        );
    }
}
