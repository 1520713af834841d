//! Role resolution: identity email to backend user record.

use std::sync::Arc;
use std::time::Duration;

use tracing::{instrument, warn};

use ordertrack_core::guard::Resolution;
use ordertrack_core::{Email, UserRecord};

use crate::backend::{BackendError, UserDirectory};
use crate::config::GuardConfig;

/// Fetches role/status records for the guards.
///
/// No caching: every guard evaluation performs its own read, and two guards
/// on one request fetch independently.
#[derive(Clone)]
pub struct RoleResolver {
    directory: Arc<dyn UserDirectory>,
    attempts: u32,
    timeout: Duration,
}

impl RoleResolver {
    /// Create a resolver with the configured retry and timeout policy.
    #[must_use]
    pub fn new(directory: Arc<dyn UserDirectory>, config: &GuardConfig) -> Self {
        Self {
            directory,
            attempts: config.role_fetch_attempts.max(1),
            timeout: config.decision_timeout,
        }
    }

    /// Single read of the record for `email`. Errors propagate; the caller
    /// owns retry policy.
    ///
    /// # Errors
    ///
    /// Returns the backend error of the failed request.
    pub async fn fetch(&self, email: &Email) -> Result<Option<UserRecord>, BackendError> {
        self.directory.get_user(email).await
    }

    /// Guard-facing resolution within the full timeout.
    ///
    /// Skipped without an email. Otherwise up to `attempts` reads with no
    /// backoff, all within the timeout budget.
    pub async fn resolve(&self, email: Option<&Email>) -> Resolution {
        self.resolve_within(email, self.timeout).await
    }

    /// Guard-facing resolution within `budget`.
    ///
    /// Guards on one request share a deadline and pass what is left of it.
    #[instrument(skip(self), fields(email = ?email.map(Email::as_str)))]
    pub async fn resolve_within(&self, email: Option<&Email>, budget: Duration) -> Resolution {
        let Some(email) = email else {
            return Resolution::Skipped;
        };

        match tokio::time::timeout(budget, self.fetch_with_retries(email)).await {
            Ok(resolution) => resolution,
            Err(_) => {
                warn!(budget_ms = budget.as_millis(), "Role fetch timed out");
                Resolution::TimedOut
            }
        }
    }

    async fn fetch_with_retries(&self, email: &Email) -> Resolution {
        let mut last_error = String::new();

        for attempt in 1..=self.attempts {
            match self.fetch(email).await {
                Ok(Some(record)) => return Resolution::Resolved(record),
                Ok(None) => return Resolution::Missing,
                Err(e) => {
                    warn!(attempt, max_attempts = self.attempts, error = %e, "Role fetch failed");
                    last_error = e.to_string();
                }
            }
        }

        Resolution::Failed(last_error)
    }

    /// The wait budget shared by every guard.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for RoleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleResolver")
            .field("attempts", &self.attempts)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use ordertrack_core::{ManagerAssignment, Role};

    use super::*;
    use crate::backend::StatusUpdate;

    /// Directory that fails a fixed number of times, then answers.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        record: Option<UserRecord>,
        hang: bool,
    }

    impl Flaky {
        fn new(failures: u32, record: Option<UserRecord>) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                record,
                hang: false,
            }
        }
    }

    #[async_trait]
    impl UserDirectory for Flaky {
        async fn get_user(&self, _email: &Email) -> Result<Option<UserRecord>, BackendError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(BackendError::Api {
                    status: 502,
                    message: "bad gateway".to_string(),
                });
            }
            Ok(self.record.clone())
        }

        async fn list_users(&self) -> Result<Vec<UserRecord>, BackendError> {
            Ok(Vec::new())
        }

        async fn create_user(&self, _record: &UserRecord) -> Result<(), BackendError> {
            Ok(())
        }

        async fn update_status(
            &self,
            _email: &Email,
            _update: &StatusUpdate,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        async fn assign_manager(
            &self,
            _email: &Email,
            _assignment: &ManagerAssignment,
        ) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn email() -> Email {
        Email::parse("manager@example.com").unwrap()
    }

    fn manager() -> UserRecord {
        let mut record = UserRecord::new_buyer(email(), "Mia".to_string());
        record.role = Some(Role::Manager);
        record
    }

    fn resolver(directory: Arc<Flaky>) -> RoleResolver {
        RoleResolver::new(directory, &GuardConfig::default())
    }

    #[tokio::test]
    async fn test_missing_email_is_skipped() {
        let directory = Arc::new(Flaky::new(0, Some(manager())));
        let resolution = resolver(directory.clone()).resolve(None).await;
        assert_eq!(resolution, Resolution::Skipped);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolves_record() {
        let directory = Arc::new(Flaky::new(0, Some(manager())));
        let resolution = resolver(directory).resolve(Some(&email())).await;
        assert_eq!(resolution, Resolution::Resolved(manager()));
    }

    #[tokio::test]
    async fn test_missing_record() {
        let directory = Arc::new(Flaky::new(0, None));
        let resolution = resolver(directory).resolve(Some(&email())).await;
        assert_eq!(resolution, Resolution::Missing);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let directory = Arc::new(Flaky::new(2, Some(manager())));
        let resolution = resolver(directory.clone()).resolve(Some(&email())).await;
        assert_eq!(resolution, Resolution::Resolved(manager()));
        assert_eq!(directory.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_three_attempts() {
        let directory = Arc::new(Flaky::new(10, Some(manager())));
        let resolution = resolver(directory.clone()).resolve(Some(&email())).await;
        assert!(matches!(resolution, Resolution::Failed(ref reason) if reason.contains("502")));
        assert_eq!(directory.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_propagates_error() {
        let directory = Arc::new(Flaky::new(1, Some(manager())));
        let resolver = resolver(directory);
        assert!(resolver.fetch(&email()).await.is_err());
        assert_eq!(resolver.fetch(&email()).await.unwrap(), Some(manager()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_backend_times_out() {
        let mut flaky = Flaky::new(0, Some(manager()));
        flaky.hang = true;
        let resolution = resolver(Arc::new(flaky)).resolve(Some(&email())).await;
        assert_eq!(resolution, Resolution::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_within_uses_the_given_budget() {
        let mut flaky = Flaky::new(0, Some(manager()));
        flaky.hang = true;
        let started = tokio::time::Instant::now();
        let resolution = resolver(Arc::new(flaky))
            .resolve_within(Some(&email()), Duration::from_millis(250))
            .await;
        assert_eq!(resolution, Resolution::TimedOut);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(250));
        assert!(elapsed < GuardConfig::default().decision_timeout);
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let config = GuardConfig {
            role_fetch_attempts: 0,
            ..GuardConfig::default()
        };
        let resolver = RoleResolver::new(Arc::new(Flaky::new(0, None)), &config);
        assert_eq!(resolver.attempts, 1);
    }
}
