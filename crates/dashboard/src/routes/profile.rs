//! Profile page: display name and avatar, stored by the identity provider.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::{IntoResponse, Redirect}};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::filters;
use crate::identity::ProfileUpdate;
use crate::middleware::{IsLogin, IsNotSuspended};
use crate::notices::{Notice, push_notice, take_notices};
use crate::shell::ShellView;
use crate::state::AppState;

const PROFILE_ROUTE: &str = "/dashboard/profile";

/// Profile form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub photo_url: String,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub shell: ShellView,
    pub display_name: String,
    pub photo_url: String,
}

/// Display the profile form.
///
/// GET /dashboard/profile
#[instrument(skip_all)]
pub async fn show(
    IsLogin(identity): IsLogin,
    IsNotSuspended(record): IsNotSuspended,
    session: Session,
) -> impl IntoResponse {
    ProfileTemplate {
        display_name: identity.display_name.clone().unwrap_or_default(),
        photo_url: identity.photo_url.clone().unwrap_or_default(),
        shell: ShellView::new(
            &identity,
            record.as_ref(),
            PROFILE_ROUTE,
            take_notices(&session).await,
        ),
    }
}

/// Save profile changes.
///
/// Blank fields are left unchanged.
///
/// POST /dashboard/profile
#[instrument(skip_all)]
pub async fn update(
    IsLogin(identity): IsLogin,
    IsNotSuspended(_): IsNotSuspended,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ProfileForm>,
) -> Redirect {
    let update = ProfileUpdate::from_form(&form.display_name, &form.photo_url);

    let notice = if update.is_empty() {
        Notice::info("Nothing to update.")
    } else {
        match state.identity().update_profile(&update).await {
            Ok(_) => {
                info!(user_id = %identity.id, "Profile updated");
                Notice::success("Profile updated.")
            }
            Err(e) => {
                warn!(error = %e, "Profile update failed");
                Notice::error(e.user_message())
            }
        }
    };

    push_notice(&session, notice).await;
    Redirect::to(PROFILE_ROUTE)
}
