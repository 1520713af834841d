//! Unified error handling for the dashboard.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use ordertrack_core::{EmailError, StatusTransitionError};

use crate::backend::BackendError;
use crate::identity::IdentityError;

/// Application-level error type for the dashboard.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend API operation failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Identity provider operation failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Requested status change is not allowed.
    #[error("Invalid status change: {0}")]
    Transition(#[from] StatusTransitionError),

    /// Malformed email in a path or form.
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Backend(BackendError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Backend(BackendError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            Self::Backend(_) | Self::Identity(_) => StatusCode::BAD_GATEWAY,
            Self::Transition(_) => StatusCode::CONFLICT,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Email(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Dashboard request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Backend(BackendError::NotFound(_)) => "Not found".to_string(),
            Self::Backend(_) | Self::Identity(_) => "External service error".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate later Sentry events with the signed-in identity.
pub fn set_sentry_user(id: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use ordertrack_core::AccountStatus;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 665f1c".to_string());
        assert_eq!(err.to_string(), "Not found: order 665f1c");

        let err = AppError::Transition(StatusTransitionError::AdminNotSuspendable);
        assert!(err.to_string().starts_with("Invalid status change"));
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Backend(BackendError::NotFound("/users/x".to_string()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Backend(BackendError::Unauthorized)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Backend(BackendError::RateLimited(5))),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Transition(StatusTransitionError::NotAllowed {
                from: AccountStatus::Pending,
                to: AccountStatus::Suspended,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Forbidden("admins only".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
