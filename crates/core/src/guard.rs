//! Route guard state machine.
//!
//! Every guard has two states: [`GuardState::Pending`] while its input is not
//! known yet, and [`GuardState::Decided`] once it can either render the page
//! or redirect. Decisions are recomputed from scratch on every request; no
//! guard keeps state between evaluations.
//!
//! A guard that is still pending when its wait budget runs out is forced to
//! [`Decision::Failed`] via [`GuardState::or_timed_out`], which the dashboard
//! renders as a retry page.

use crate::{Identity, UserRecord};

/// Where unauthenticated visitors are sent.
pub const LOGIN_ROUTE: &str = "/auth/login";

/// Where non-staff visitors of staff pages are sent.
pub const STAFF_FALLBACK_ROUTE: &str = "/dashboard";

/// Where suspended accounts are sent.
pub const SUSPENDED_ROUTE: &str = "/account-suspended";

/// Warning shown once when `IsAdminManager` turns a visitor away.
pub const STAFF_ONLY_WARNING: &str = "That page is only available to managers and admins.";

/// Warning shown once when `IsSuspended` turns a visitor away.
pub const SUSPENDED_WARNING: &str = "Your account is suspended.";

/// Outcome of the role lookup that feeds `IsAdminManager` and `IsSuspended`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No email to look up; resolution was skipped.
    Skipped,
    /// The lookup has not completed.
    InFlight,
    /// The backend returned a record.
    Resolved(UserRecord),
    /// The backend has no record for this email.
    Missing,
    /// Every attempt failed.
    Failed(String),
    /// The wait budget ran out before any attempt succeeded.
    TimedOut,
}

impl Resolution {
    /// The resolved record, if any.
    #[must_use]
    pub const fn record(&self) -> Option<&UserRecord> {
        match self {
            Self::Resolved(record) => Some(record),
            _ => None,
        }
    }
}

/// Redirect target plus an optional one-shot warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect {
    /// Route to send the visitor to.
    pub to: &'static str,
    /// Warning to show once on the target page.
    pub warning: Option<&'static str>,
}

/// Why a guard could not decide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Inputs did not arrive within the wait budget.
    TimedOut,
    /// The role lookup failed.
    Lookup(String),
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimedOut => f.write_str("timed out waiting for account details"),
            Self::Lookup(reason) => write!(f, "could not load account details: {reason}"),
        }
    }
}

/// Terminal guard outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Render the protected page.
    Render,
    /// Send the visitor elsewhere.
    Redirect(Redirect),
    /// No decision possible; offer a retry.
    Failed(Failure),
}

/// Guard state: waiting, or decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    /// Inputs not resolved yet.
    Pending,
    /// Final outcome for this evaluation.
    Decided(Decision),
}

impl GuardState {
    /// Collapse the state after the wait budget is spent.
    #[must_use]
    pub fn or_timed_out(self) -> Decision {
        match self {
            Self::Pending => Decision::Failed(Failure::TimedOut),
            Self::Decided(decision) => decision,
        }
    }
}

/// `IsLogin`: render iff an identity is present.
#[must_use]
pub fn is_login(loading: bool, identity: Option<&Identity>) -> GuardState {
    if loading {
        return GuardState::Pending;
    }
    match identity {
        Some(_) => GuardState::Decided(Decision::Render),
        None => GuardState::Decided(Decision::Redirect(Redirect {
            to: LOGIN_ROUTE,
            warning: None,
        })),
    }
}

/// `IsAdminManager`: render iff the resolved role is Admin or Manager.
#[must_use]
pub fn is_admin_manager(resolution: &Resolution) -> GuardState {
    let deny = || {
        GuardState::Decided(Decision::Redirect(Redirect {
            to: STAFF_FALLBACK_ROUTE,
            warning: Some(STAFF_ONLY_WARNING),
        }))
    };

    match resolution {
        Resolution::InFlight => GuardState::Pending,
        Resolution::Resolved(record) if record.is_staff() => GuardState::Decided(Decision::Render),
        Resolution::Resolved(_) | Resolution::Missing | Resolution::Skipped => deny(),
        Resolution::Failed(reason) => {
            GuardState::Decided(Decision::Failed(Failure::Lookup(reason.clone())))
        }
        Resolution::TimedOut => GuardState::Decided(Decision::Failed(Failure::TimedOut)),
    }
}

/// `IsSuspended`: redirect iff the resolved status is suspended.
///
/// Absent or unknown statuses pass through, as do accounts without a record.
#[must_use]
pub fn is_suspended(resolution: &Resolution) -> GuardState {
    match resolution {
        Resolution::InFlight => GuardState::Pending,
        Resolution::Resolved(record) if record.is_suspended() => {
            GuardState::Decided(Decision::Redirect(Redirect {
                to: SUSPENDED_ROUTE,
                warning: Some(SUSPENDED_WARNING),
            }))
        }
        Resolution::Resolved(_) | Resolution::Missing | Resolution::Skipped => {
            GuardState::Decided(Decision::Render)
        }
        Resolution::Failed(reason) => {
            GuardState::Decided(Decision::Failed(Failure::Lookup(reason.clone())))
        }
        Resolution::TimedOut => GuardState::Decided(Decision::Failed(Failure::TimedOut)),
    }
}
