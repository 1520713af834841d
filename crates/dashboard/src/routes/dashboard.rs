//! Overview and account-suspended pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use ordertrack_core::guard::{Resolution, STAFF_FALLBACK_ROUTE};
use ordertrack_core::{AccountStatus, UserRecord};

use crate::backend::DashboardStats;
use crate::filters;
use crate::middleware::{IsLogin, IsNotSuspended};
use crate::notices::{Notice, take_notices};
use crate::shell::ShellView;
use crate::state::AppState;

/// Overview template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub shell: ShellView,
    pub status_label: &'static str,
    pub awaiting_activation: bool,
    pub stats: Option<DashboardStats>,
}

/// Account-suspended template.
#[derive(Template, WebTemplate)]
#[template(path = "suspended.html")]
pub struct SuspendedTemplate {
    pub greeting: String,
    pub reason: Option<String>,
    pub notices: Vec<Notice>,
}

/// Status label for the overview card.
fn status_label(record: Option<&UserRecord>) -> &'static str {
    match record.and_then(|r| r.status) {
        Some(AccountStatus::Active) => "Active",
        Some(AccountStatus::Pending) => "Pending activation",
        Some(AccountStatus::Suspended) => "Suspended",
        None => "Unknown",
    }
}

/// Overview page handler.
///
/// Staff additionally see the backend's aggregate counters; a failed stats
/// request leaves the cards out rather than failing the page.
///
/// GET /dashboard
#[instrument(skip_all)]
pub async fn overview(
    IsLogin(identity): IsLogin,
    IsNotSuspended(record): IsNotSuspended,
    State(state): State<AppState>,
    session: Session,
) -> impl IntoResponse {
    let shell = ShellView::new(
        &identity,
        record.as_ref(),
        STAFF_FALLBACK_ROUTE,
        take_notices(&session).await,
    );

    let stats = if shell.is_staff() {
        match state.orders().stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::error!("Failed to fetch stats: {e}");
                None
            }
        }
    } else {
        None
    };

    DashboardTemplate {
        status_label: status_label(record.as_ref()),
        awaiting_activation: record
            .as_ref()
            .is_some_and(|r| r.status == Some(AccountStatus::Pending)),
        stats,
        shell,
    }
}

/// Account-suspended page handler.
///
/// Accounts that are not suspended are sent back to the overview.
///
/// GET /account-suspended
#[instrument(skip_all)]
pub async fn suspended(
    IsLogin(identity): IsLogin,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let reason = match state.resolver().resolve(identity.email.as_ref()).await {
        Resolution::Resolved(record) if record.is_suspended() => record.suspend_reason,
        // Status unknown; show the page without a reason.
        Resolution::Failed(_) | Resolution::TimedOut => None,
        _ => return Redirect::to(STAFF_FALLBACK_ROUTE).into_response(),
    };

    SuspendedTemplate {
        greeting: identity.greeting_name().to_string(),
        reason,
        notices: take_notices(&session).await,
    }
    .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ordertrack_core::Email;

    use super::*;

    #[test]
    fn test_status_label() {
        let mut record = UserRecord::new_buyer(
            Email::parse("b@example.com").unwrap(),
            "B".to_string(),
        );
        assert_eq!(status_label(Some(&record)), "Pending activation");
        record.status = Some(AccountStatus::Active);
        assert_eq!(status_label(Some(&record)), "Active");
        assert_eq!(status_label(None), "Unknown");
    }
}
