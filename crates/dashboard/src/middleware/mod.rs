//! HTTP middleware stack for the dashboard.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors, added by the binary)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions memory store: sign-in binding and notices)
//! 4. Security headers
//!
//! Route guards are extractors rather than layers; see [`guard`].

pub mod guard;
pub mod security_headers;
pub mod session;

pub use guard::{
    GuardRejection, IsAdminManager, IsLogin, IsNotSuspended, clear_signed_in, session_identity,
    set_signed_in,
};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
