//! Authentication route handlers.
//!
//! Sign-in, registration and password reset are delegated to the identity
//! provider. Outcomes are reported through one-shot notices.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use ordertrack_core::guard::{LOGIN_ROUTE, STAFF_FALLBACK_ROUTE};
use ordertrack_core::{Email, Identity, UserRecord};

use crate::error::clear_sentry_user;
use crate::filters;
use crate::middleware::{clear_signed_in, session_identity, set_signed_in};
use crate::notices::{Notice, NoticeLevel, push_notice, take_notices};
use crate::state::AppState;

/// Minimum password length accepted by the identity provider.
const MIN_PASSWORD_LENGTH: usize = 6;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Password reset form data.
#[derive(Debug, Deserialize)]
pub struct ResetForm {
    pub email: String,
}

/// Federated sign-in data posted by the provider's client-side button.
#[derive(Debug, Deserialize)]
pub struct FederatedForm {
    pub provider_id: String,
    pub id_token: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub notices: Vec<Notice>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub notices: Vec<Notice>,
}

/// Password reset page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset.html")]
pub struct ResetTemplate {
    pub notices: Vec<Notice>,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/federated", post(federated))
        .route("/auth/register", get(register_page).post(register))
        .route("/auth/reset-password", get(reset_page).post(reset))
        .route("/auth/logout", post(logout))
}

/// Wait for the session store to show `identity` before redirecting to a
/// guarded page.
async fn await_session(state: &AppState, identity: &Identity) {
    let id = identity.id.clone();
    let caught_up = state
        .session()
        .wait_until(state.resolver().timeout(), move |s| {
            s.identity.as_ref().is_some_and(|i| i.id == id)
        })
        .await;
    if caught_up.is_none() {
        warn!("Session store did not observe sign-in in time");
    }
}

/// Bind this browser to `identity` once the store shows it.
///
/// On failure an error notice is queued and the login route returned.
async fn complete_sign_in(
    state: &AppState,
    session: &Session,
    identity: &Identity,
) -> Result<(), Redirect> {
    await_session(state, identity).await;
    if let Err(e) = set_signed_in(session, identity).await {
        warn!(error = %e, "Failed to bind session to identity");
        push_notice(
            session,
            Notice::error("Could not start your session. Please try again."),
        )
        .await;
        return Err(Redirect::to(LOGIN_ROUTE));
    }
    Ok(())
}

/// Notice for a backend record that could not be created.
fn record_not_saved() -> Notice {
    Notice::warning("Account created, but your profile could not be saved. Please contact support.")
}

// =============================================================================
// Login
// =============================================================================

/// Display the login page.
///
/// GET /auth/login
pub async fn login_page(State(state): State<AppState>, session: Session) -> Response {
    if session_identity(&state, &session).await.is_some() {
        return Redirect::to(STAFF_FALLBACK_ROUTE).into_response();
    }

    LoginTemplate {
        notices: take_notices(&session).await,
    }
    .into_response()
}

/// Handle login form submission.
///
/// POST /auth/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Redirect {
    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(_) => {
            push_notice(&session, Notice::error("Please enter a valid email address.")).await;
            return Redirect::to(LOGIN_ROUTE);
        }
    };
    let password = SecretString::from(form.password);

    match state.identity().sign_in_with_password(&email, &password).await {
        Ok(identity) => {
            info!(user_id = %identity.id, "Signed in");
            if let Err(redirect) = complete_sign_in(&state, &session, &identity).await {
                return redirect;
            }
            push_notice(
                &session,
                Notice::success(format!("Welcome back, {}!", identity.greeting_name())),
            )
            .await;
            Redirect::to(STAFF_FALLBACK_ROUTE)
        }
        Err(e) => {
            warn!(error = %e, "Login failed");
            push_notice(&session, Notice::error(e.user_message())).await;
            Redirect::to(LOGIN_ROUTE)
        }
    }
}

/// Handle a federated sign-in.
///
/// First-time federated users get a Buyer record, like self-registered ones.
///
/// POST /auth/federated
#[instrument(skip_all, fields(provider_id))]
pub async fn federated(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<FederatedForm>,
) -> Redirect {
    tracing::Span::current().record("provider_id", form.provider_id.as_str());
    let id_token = SecretString::from(form.id_token);

    let identity = match state
        .identity()
        .sign_in_with_idp(&form.provider_id, &id_token)
        .await
    {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "Federated sign-in failed");
            push_notice(&session, Notice::error(e.user_message())).await;
            return Redirect::to(LOGIN_ROUTE);
        }
    };

    let mut notice = Notice::success(format!("Welcome, {}!", identity.greeting_name()));
    if let Some(email) = &identity.email {
        match state.resolver().fetch(email).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                let name = identity.display_name.clone().unwrap_or_default();
                let record = UserRecord::new_buyer(email.clone(), name);
                if let Err(e) = state.users().create_user(&record).await {
                    warn!(error = %e, "Failed to create record for federated user");
                    notice = record_not_saved();
                }
            }
            Err(e) => warn!(error = %e, "Could not check for an existing record"),
        }
    }

    if let Err(redirect) = complete_sign_in(&state, &session, &identity).await {
        return redirect;
    }
    push_notice(&session, notice).await;
    Redirect::to(STAFF_FALLBACK_ROUTE)
}

// =============================================================================
// Registration
// =============================================================================

/// Display the registration page.
///
/// GET /auth/register
pub async fn register_page(session: Session) -> impl IntoResponse {
    RegisterTemplate {
        notices: take_notices(&session).await,
    }
}

/// Handle registration form submission.
///
/// Creates the provider account, then a backend record with role Buyer and
/// status pending.
///
/// POST /auth/register
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Redirect {
    const REGISTER_ROUTE: &str = "/auth/register";

    if let Err(message) = validate_registration(&form) {
        push_notice(&session, Notice::error(message)).await;
        return Redirect::to(REGISTER_ROUTE);
    }

    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(_) => {
            push_notice(&session, Notice::error("Please enter a valid email address.")).await;
            return Redirect::to(REGISTER_ROUTE);
        }
    };
    let name = form.name.trim().to_string();
    let password = SecretString::from(form.password);

    let identity = match state
        .identity()
        .sign_up(&email, &password, (!name.is_empty()).then_some(name.as_str()))
        .await
    {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "Registration failed");
            push_notice(&session, Notice::error(e.user_message())).await;
            return Redirect::to(REGISTER_ROUTE);
        }
    };

    let record = UserRecord::new_buyer(email, name);
    let notice = match state.users().create_user(&record).await {
        Ok(()) => Notice::success("Account created. It will be usable once activated."),
        Err(e) => {
            warn!(error = %e, "Account created but backend record failed");
            record_not_saved()
        }
    };

    info!(user_id = %identity.id, "Registered");
    if let Err(redirect) = complete_sign_in(&state, &session, &identity).await {
        return redirect;
    }
    push_notice(&session, notice).await;
    Redirect::to(STAFF_FALLBACK_ROUTE)
}

/// Check a registration form before contacting the provider.
fn validate_registration(form: &RegisterForm) -> Result<(), &'static str> {
    if form.password != form.password_confirm {
        return Err("Passwords do not match.");
    }
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 6 characters.");
    }
    Ok(())
}

// =============================================================================
// Password Reset
// =============================================================================

/// Display the password reset page.
///
/// GET /auth/reset-password
pub async fn reset_page(session: Session) -> impl IntoResponse {
    ResetTemplate {
        notices: take_notices(&session).await,
    }
}

/// Send a password reset email.
///
/// Always reports the same outcome so the form cannot be used to discover
/// registered addresses.
///
/// POST /auth/reset-password
#[instrument(skip_all)]
pub async fn reset(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ResetForm>,
) -> Redirect {
    match Email::parse(&form.email) {
        Ok(email) => {
            if let Err(e) = state.identity().send_password_reset(&email).await {
                warn!(error = %e, "Password reset request failed");
            }
        }
        Err(e) => warn!(error = %e, "Password reset for malformed email"),
    }

    push_notice(
        &session,
        Notice::info("If an account exists for that email, a reset link is on its way."),
    )
    .await;
    Redirect::to(LOGIN_ROUTE)
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out.
///
/// Only a browser bound to the current identity signs it out of the
/// provider; any other browser just drops its stale binding.
///
/// POST /auth/logout
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Redirect {
    if session_identity(&state, &session).await.is_none() {
        if let Err(e) = clear_signed_in(&session).await {
            warn!(error = %e, "Failed to clear sign-in binding");
        }
        return Redirect::to(LOGIN_ROUTE);
    }

    let notice = state.session().sign_out(state.identity()).await;
    if notice.level != NoticeLevel::Error {
        if let Err(e) = clear_signed_in(&session).await {
            warn!(error = %e, "Failed to clear sign-in binding");
        }
        clear_sentry_user();
    }
    push_notice(&session, notice).await;
    Redirect::to(LOGIN_ROUTE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: password.to_string(),
            password_confirm: confirm.to_string(),
        }
    }

    #[test]
    fn test_validate_registration() {
        assert_eq!(
            validate_registration(&form("secret1", "secret2")),
            Err("Passwords do not match.")
        );
        assert_eq!(
            validate_registration(&form("abc", "abc")),
            Err("Password must be at least 6 characters.")
        );
        assert_eq!(validate_registration(&form("secret1", "secret1")), Ok(()));
    }
}
