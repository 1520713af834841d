//! Session layer for per-browser state.
//!
//! Identity is process-wide (see [`SessionStore`](crate::session::SessionStore)).
//! The cookie session binds a browser to that identity and carries one-shot
//! notices. An in-memory store is enough; a restart signs every browser out.

use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::DashboardConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "ordertrack_session";

/// Session expiry time in seconds (1 hour of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &DashboardConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
