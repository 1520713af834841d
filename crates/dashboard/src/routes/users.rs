//! User management page.
//!
//! Managers and admins can view every account; only admins can change one.
//! Admin records are never offered the suspend action, and the handler
//! refuses it as well.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use ordertrack_core::{AccountStatus, Email, UserRecord};

use crate::backend::StatusUpdate;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{IsAdminManager, IsLogin, IsNotSuspended};
use crate::notices::{Notice, push_notice, take_notices};
use crate::shell::ShellView;
use crate::state::AppState;

/// Route of the user management page.
const USERS_ROUTE: &str = "/dashboard/users";

/// Suspend form data.
#[derive(Debug, Deserialize)]
pub struct SuspendForm {
    #[serde(default)]
    pub reason: String,
}

/// Manager assignment form data.
#[derive(Debug, Deserialize)]
pub struct ManagerForm {
    #[serde(default)]
    pub unit: String,
}

/// User row for templates.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub email: String,
    pub email_path: String,
    pub name: String,
    pub role: &'static str,
    pub status: &'static str,
    pub manager_for: Option<String>,
    pub suspend_reason: Option<String>,
    pub can_activate: bool,
    pub can_suspend: bool,
    pub can_toggle_manager: bool,
}

impl UserRow {
    /// Build a row; actions are only enabled for an admin viewer.
    fn new(record: &UserRecord, viewer_is_admin: bool) -> Self {
        let actions = record.actions();
        Self {
            email: record.email.to_string(),
            email_path: urlencoding::encode(record.email.as_str()).into_owned(),
            name: record.name.clone(),
            role: record.role.map_or("-", |role| role.as_str()),
            status: record.status.map_or("-", AccountStatus::as_str),
            manager_for: record.manager_for.clone(),
            suspend_reason: record.suspend_reason.clone(),
            can_activate: viewer_is_admin && actions.activate,
            can_suspend: viewer_is_admin && actions.suspend,
            can_toggle_manager: viewer_is_admin && actions.toggle_manager,
        }
    }
}

/// User management template.
#[derive(Template, WebTemplate)]
#[template(path = "users/index.html")]
pub struct UsersTemplate {
    pub shell: ShellView,
    pub users: Vec<UserRow>,
    pub read_only: bool,
}

/// Refuse mutations from non-admin staff.
fn require_admin(viewer: &UserRecord) -> Result<()> {
    if viewer.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "only admins can change accounts".to_string(),
        ))
    }
}

/// Load the target record of a mutation.
async fn load_target(state: &AppState, raw_email: &str) -> Result<UserRecord> {
    let email = Email::parse(raw_email)?;
    state
        .users()
        .get_user(&email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {email}")))
}

/// User list.
///
/// GET /dashboard/users
#[instrument(skip_all)]
pub async fn index(
    IsLogin(identity): IsLogin,
    IsNotSuspended(_): IsNotSuspended,
    IsAdminManager(viewer): IsAdminManager,
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse> {
    let mut records = state.users().list_users().await?;
    records.sort_by(|a, b| a.email.cmp(&b.email));

    let viewer_is_admin = viewer.is_admin();
    Ok(UsersTemplate {
        shell: ShellView::new(
            &identity,
            Some(&viewer),
            USERS_ROUTE,
            take_notices(&session).await,
        ),
        users: records
            .iter()
            .map(|record| UserRow::new(record, viewer_is_admin))
            .collect(),
        read_only: !viewer_is_admin,
    })
}

/// Activate or reactivate an account.
///
/// POST /dashboard/users/{email}/activate
#[instrument(skip_all)]
pub async fn activate(
    IsLogin(_): IsLogin,
    IsNotSuspended(_): IsNotSuspended,
    IsAdminManager(viewer): IsAdminManager,
    State(state): State<AppState>,
    session: Session,
    Path(email): Path<String>,
) -> Result<Redirect> {
    require_admin(&viewer)?;
    let target = load_target(&state, &email).await?;

    let notice = match target
        .status
        .unwrap_or_default()
        .transition_to(AccountStatus::Active, target.role)
    {
        Ok(_) => {
            state
                .users()
                .update_status(&target.email, &StatusUpdate::activate())
                .await?;
            info!(target = %target.email, by = %viewer.email, "Account activated");
            Notice::success(format!("{} is now active.", target.email))
        }
        Err(e) => Notice::error(format!("Cannot activate {}: {e}.", target.email)),
    };

    push_notice(&session, notice).await;
    Ok(Redirect::to(USERS_ROUTE))
}

/// Suspend an account with a reason.
///
/// POST /dashboard/users/{email}/suspend
#[instrument(skip_all)]
pub async fn suspend(
    IsLogin(_): IsLogin,
    IsNotSuspended(_): IsNotSuspended,
    IsAdminManager(viewer): IsAdminManager,
    State(state): State<AppState>,
    session: Session,
    Path(email): Path<String>,
    Form(form): Form<SuspendForm>,
) -> Result<Redirect> {
    require_admin(&viewer)?;
    let target = load_target(&state, &email).await?;

    let update = StatusUpdate::suspend(&form.reason);
    let notice = if update.suspend_reason.is_none() {
        Notice::error("A reason is required to suspend an account.")
    } else {
        match target
            .status
            .unwrap_or_default()
            .transition_to(AccountStatus::Suspended, target.role)
        {
            Ok(_) => {
                state.users().update_status(&target.email, &update).await?;
                info!(target = %target.email, by = %viewer.email, "Account suspended");
                Notice::success(format!("{} has been suspended.", target.email))
            }
            Err(e) => Notice::error(format!("Cannot suspend {}: {e}.", target.email)),
        }
    };

    push_notice(&session, notice).await;
    Ok(Redirect::to(USERS_ROUTE))
}

/// Toggle the manager assignment of an account.
///
/// An assigned account is unassigned; an unassigned one is assigned to the
/// submitted unit.
///
/// POST /dashboard/users/{email}/manager
#[instrument(skip_all)]
pub async fn toggle_manager(
    IsLogin(_): IsLogin,
    IsNotSuspended(_): IsNotSuspended,
    IsAdminManager(viewer): IsAdminManager,
    State(state): State<AppState>,
    session: Session,
    Path(email): Path<String>,
    Form(form): Form<ManagerForm>,
) -> Result<Redirect> {
    require_admin(&viewer)?;
    let target = load_target(&state, &email).await?;

    let notice = if target.is_admin() {
        Notice::error("Admin accounts cannot be assigned as managers.")
    } else {
        let assignment = target.toggle_manager(&form.unit);
        match &assignment.manager_for {
            Some(unit) if unit.is_empty() => {
                Notice::error("Enter the unit this manager is responsible for.")
            }
            Some(unit) => {
                let message = format!("{} now manages {unit}.", target.email);
                state.users().assign_manager(&target.email, &assignment).await?;
                info!(target = %target.email, by = %viewer.email, "Manager assigned");
                Notice::success(message)
            }
            None => {
                state.users().assign_manager(&target.email, &assignment).await?;
                info!(target = %target.email, by = %viewer.email, "Manager unassigned");
                Notice::success(format!("{} is no longer a manager.", target.email))
            }
        }
    };

    push_notice(&session, notice).await;
    Ok(Redirect::to(USERS_ROUTE))
}
