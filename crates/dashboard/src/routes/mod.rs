//! HTTP route handlers for the dashboard.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Health check
//! GET  /                                    - Redirect to /dashboard
//!
//! # Auth
//! GET  /auth/login                          - Login page
//! POST /auth/login                          - Email/password sign-in
//! POST /auth/federated                      - Federated (IdP token) sign-in
//! GET  /auth/register                       - Registration page
//! POST /auth/register                       - Create account (Buyer, pending)
//! GET  /auth/reset-password                 - Password reset page
//! POST /auth/reset-password                 - Send reset email
//! POST /auth/logout                         - Sign out
//!
//! # Dashboard (IsLogin + IsNotSuspended)
//! GET  /dashboard                           - Overview
//! GET  /dashboard/my-orders                 - Own orders
//! GET  /dashboard/orders/{id}/tracking      - Order timeline
//! GET  /dashboard/profile                   - Profile form
//! POST /dashboard/profile                   - Save profile
//!
//! # Staff (+ IsAdminManager)
//! GET  /dashboard/orders/pending            - Approval queue
//! POST /dashboard/orders/{id}/approve       - Approve order
//! POST /dashboard/orders/{id}/reject        - Reject order
//! GET  /dashboard/users                     - User list
//! POST /dashboard/users/{email}/activate    - Activate (admin only)
//! POST /dashboard/users/{email}/suspend     - Suspend (admin only)
//! POST /dashboard/users/{email}/manager     - Toggle manager (admin only)
//!
//! # Suspended accounts (IsLogin)
//! GET  /account-suspended                   - Suspension notice
//! ```

pub mod auth;
pub mod dashboard;
pub mod orders;
pub mod profile;
pub mod users;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use ordertrack_core::guard::STAFF_FALLBACK_ROUTE;

use crate::middleware::{create_session_layer, security_headers_middleware};
use crate::state::AppState;

/// Create the dashboard page routes.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::overview))
        .route("/dashboard/my-orders", get(orders::my_orders))
        .route("/dashboard/orders/pending", get(orders::pending))
        .route("/dashboard/orders/{id}/tracking", get(orders::tracking))
        .route("/dashboard/orders/{id}/approve", post(orders::approve))
        .route("/dashboard/orders/{id}/reject", post(orders::reject))
        .route("/dashboard/users", get(users::index))
        .route("/dashboard/users/{email}/activate", post(users::activate))
        .route("/dashboard/users/{email}/suspend", post(users::suspend))
        .route("/dashboard/users/{email}/manager", post(users::toggle_manager))
        .route("/dashboard/profile", get(profile::show).post(profile::update))
        .route("/account-suspended", get(dashboard::suspended))
}

/// Every route, without middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/", get(|| async { Redirect::to(STAFF_FALLBACK_ROUTE) }))
        .merge(auth::router())
        .merge(dashboard_routes())
}

/// The complete application: routes, sessions, security headers and
/// request tracing.
///
/// Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    routes()
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
