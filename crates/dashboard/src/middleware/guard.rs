//! Route guard extractors.
//!
//! Each extractor evaluates one guard from [`ordertrack_core::guard`] per
//! request and either yields its input to the handler or rejects:
//!
//! - [`IsLogin`] - requires a signed-in identity
//! - [`IsNotSuspended`] - redirects suspended accounts
//! - [`IsAdminManager`] - requires the Manager or Admin role
//!
//! Guards are independent. A handler that takes several of them runs them in
//! argument order, and each role guard performs its own lookup.
//!
//! The signed-in identity is process-wide, but a request only sees it when
//! its cookie session was bound to that identity at sign-in. Role guards
//! look up the identity [`IsLogin`] verified for the request.
//!
//! All guards on one request share a single deadline of the resolver's
//! timeout. A guard still pending when it passes renders a retry page with
//! `503 Service Unavailable`.

use askama::Template;
use askama_web::WebTemplate;
use std::time::Duration;

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tokio::time::Instant;
use tower_sessions::Session;
use tracing::{debug, warn};

use ordertrack_core::guard::{self, Decision, Failure, GuardState, Resolution};
use ordertrack_core::{Email, Identity, UserRecord};

use crate::error::set_sentry_user;
use crate::filters;
use crate::notices::{Notice, push_notice};
use crate::state::AppState;

/// Session keys owned by the guards.
pub mod session_keys {
    /// Provider id of the identity this browser signed in as.
    pub const SIGNED_IN_AS: &str = "signed_in_as";
}

/// Bind the browser session to `identity` after a successful sign-in.
///
/// The session id is cycled first so a pre-login cookie cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_signed_in(
    session: &Session,
    identity: &Identity,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::SIGNED_IN_AS, identity.id.as_str())
        .await
}

/// Clear the sign-in binding (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_signed_in(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<String>(session_keys::SIGNED_IN_AS).await?;
    Ok(())
}

/// Provider id this browser session is bound to, if any.
pub async fn signed_in_id(session: &Session) -> Option<String> {
    session
        .get::<String>(session_keys::SIGNED_IN_AS)
        .await
        .inspect_err(|e| warn!(error = %e, "Failed to read sign-in binding"))
        .ok()
        .flatten()
}

/// The store's identity, if `session` is bound to it.
pub async fn session_identity(state: &AppState, session: &Session) -> Option<Identity> {
    let bound = signed_in_id(session).await?;
    state
        .session()
        .snapshot()
        .identity
        .filter(|identity| identity.id == bound)
}

/// Retry page shown when a guard cannot decide.
#[derive(Template, WebTemplate)]
#[template(path = "retry.html")]
pub struct RetryTemplate {
    pub message: String,
    pub retry_to: String,
}

/// Rejection produced by a guard.
#[derive(Debug)]
pub enum GuardRejection {
    /// Send the visitor elsewhere.
    Redirect(&'static str),
    /// No decision was possible; offer to retry `retry_to`.
    Failed { failure: Failure, retry_to: String },
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(to) => Redirect::to(to).into_response(),
            Self::Failed { failure, retry_to } => {
                tracing::warn!(error = %failure, path = %retry_to, "Guard could not decide");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    RetryTemplate {
                        message: failure.to_string(),
                        retry_to,
                    },
                )
                    .into_response()
            }
        }
    }
}

/// Turn a decision into `Ok` (render) or a rejection, queueing the
/// redirect's warning for the next page.
async fn enforce(parts: &Parts, decision: Decision) -> Result<(), GuardRejection> {
    match decision {
        Decision::Render => Ok(()),
        Decision::Redirect(redirect) => {
            debug!(path = %parts.uri.path(), to = redirect.to, "Guard redirect");
            if let (Some(warning), Some(session)) =
                (redirect.warning, parts.extensions.get::<Session>())
            {
                push_notice(session, Notice::warning(warning)).await;
            }
            Err(GuardRejection::Redirect(redirect.to))
        }
        Decision::Failed(failure) => Err(GuardRejection::Failed {
            failure,
            retry_to: retry_target(parts),
        }),
    }
}

/// Path and query of the request, for the retry link.
fn retry_target(parts: &Parts) -> String {
    parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), ToString::to_string)
}

/// Deadline shared by every guard on a request.
#[derive(Debug, Clone, Copy)]
struct GuardDeadline(Instant);

/// Time left before this request's guard deadline, starting the clock on
/// first use.
fn remaining_budget(parts: &mut Parts, state: &AppState) -> Duration {
    let deadline = match parts.extensions.get::<GuardDeadline>() {
        Some(deadline) => *deadline,
        None => {
            let deadline = GuardDeadline(Instant::now() + state.resolver().timeout());
            parts.extensions.insert(deadline);
            deadline
        }
    };
    deadline.0.saturating_duration_since(Instant::now())
}

/// Identity [`IsLogin`] verified for this request.
#[derive(Debug, Clone)]
struct VerifiedIdentity(Identity);

/// The verified identity, running [`IsLogin`] if no guard has yet.
async fn verified_identity(
    parts: &mut Parts,
    state: &AppState,
) -> Result<Identity, GuardRejection> {
    if let Some(VerifiedIdentity(identity)) = parts.extensions.get::<VerifiedIdentity>() {
        return Ok(identity.clone());
    }
    let IsLogin(identity) = IsLogin::from_request_parts(parts, state).await?;
    Ok(identity)
}

/// Record only present after a `Render` decision.
fn rendered_record(parts: &Parts, resolution: Resolution) -> Result<UserRecord, GuardRejection> {
    match resolution {
        Resolution::Resolved(record) => Ok(record),
        other => Err(GuardRejection::Failed {
            failure: Failure::Lookup(format!("unexpected resolution {other:?}")),
            retry_to: retry_target(parts),
        }),
    }
}

/// Extractor that requires a signed-in identity bound to this browser
/// session.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(IsLogin(identity): IsLogin) -> impl IntoResponse {
///     format!("Hello, {}!", identity.greeting_name())
/// }
/// ```
pub struct IsLogin(pub Identity);

impl FromRequestParts<AppState> for IsLogin {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let budget = remaining_budget(parts, state);
        let loaded = state.session().wait_until_loaded(budget).await;

        let bound = match parts.extensions.get::<Session>() {
            Some(session) => signed_in_id(session).await,
            None => None,
        };
        let identity = loaded
            .as_ref()
            .and_then(|s| s.identity.as_ref())
            .filter(|identity| bound.as_deref() == Some(identity.id.as_str()))
            .cloned();

        let decision = loaded
            .as_ref()
            .map_or(GuardState::Pending, |s| {
                guard::is_login(s.loading, identity.as_ref())
            })
            .or_timed_out();
        enforce(parts, decision).await?;

        let identity = identity.ok_or(GuardRejection::Redirect(guard::LOGIN_ROUTE))?;

        set_sentry_user(
            &identity.id,
            identity.email.as_ref().map(Email::as_str),
        );
        parts.extensions.insert(VerifiedIdentity(identity.clone()));
        Ok(Self(identity))
    }
}

/// Extractor that redirects suspended accounts.
///
/// Yields the resolved record, or `None` when the backend has none or the
/// identity has no email.
pub struct IsNotSuspended(pub Option<UserRecord>);

impl FromRequestParts<AppState> for IsNotSuspended {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = verified_identity(parts, state).await?;
        let budget = remaining_budget(parts, state);
        let resolution = state
            .resolver()
            .resolve_within(identity.email.as_ref(), budget)
            .await;
        let decision = guard::is_suspended(&resolution).or_timed_out();
        enforce(parts, decision).await?;

        Ok(Self(resolution.record().cloned()))
    }
}

/// Extractor that requires the Manager or Admin role.
///
/// Denied visitors are sent to the overview with a one-shot warning.
pub struct IsAdminManager(pub UserRecord);

impl FromRequestParts<AppState> for IsAdminManager {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = verified_identity(parts, state).await?;
        let budget = remaining_budget(parts, state);
        let resolution = state
            .resolver()
            .resolve_within(identity.email.as_ref(), budget)
            .await;
        let decision = guard::is_admin_manager(&resolution).or_timed_out();
        enforce(parts, decision).await?;

        rendered_record(parts, resolution).map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(uri: &str) -> Parts {
        Request::builder().uri(uri).body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_retry_target_keeps_query() {
        assert_eq!(
            retry_target(&parts("/dashboard/orders/pending?page=2")),
            "/dashboard/orders/pending?page=2"
        );
        assert_eq!(retry_target(&parts("/dashboard")), "/dashboard");
    }
}
