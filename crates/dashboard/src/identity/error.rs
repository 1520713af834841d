//! Identity provider errors.

use thiserror::Error;

/// Errors that can occur when talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed email address.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] ordertrack_core::EmailError),

    /// Wrong password or unknown account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("email already registered")]
    EmailExists,

    /// The account was disabled by an administrator.
    #[error("account disabled")]
    UserDisabled,

    /// Password rejected by the provider's policy.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// Too many failed attempts.
    #[error("too many attempts, try again later")]
    TooManyAttempts,

    /// Any other provider-side rejection.
    #[error("provider error ({code}): {message}")]
    Rejected {
        /// HTTP status code.
        code: u16,
        /// Provider error message.
        message: String,
    },

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Operation needs a signed-in identity.
    #[error("not signed in")]
    NotSignedIn,
}

impl IdentityError {
    /// Map a provider error message (e.g. `INVALID_PASSWORD`) to an error.
    ///
    /// Messages may carry a detail suffix after `" : "`.
    #[must_use]
    pub fn from_provider(code: u16, message: &str) -> Self {
        let (key, detail) = message
            .split_once(" : ")
            .map_or((message, None), |(key, detail)| (key, Some(detail)));

        match key.trim() {
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS"
            | "INVALID_IDP_RESPONSE" => Self::InvalidCredentials,
            "EMAIL_EXISTS" => Self::EmailExists,
            "USER_DISABLED" => Self::UserDisabled,
            "WEAK_PASSWORD" => Self::WeakPassword(
                detail
                    .unwrap_or("Password should be at least 6 characters")
                    .to_string(),
            ),
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyAttempts,
            "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" => Self::NotSignedIn,
            _ => Self::Rejected {
                code,
                message: message.to_string(),
            },
        }
    }

    /// Text safe to show on the login and registration pages.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Invalid email or password.".to_string(),
            Self::EmailExists => "An account with this email already exists.".to_string(),
            Self::UserDisabled => "This account has been disabled.".to_string(),
            Self::WeakPassword(detail) => detail.clone(),
            Self::TooManyAttempts => {
                "Too many attempts. Please wait a moment and try again.".to_string()
            }
            Self::InvalidEmail(_) => "Please enter a valid email address.".to_string(),
            Self::NotSignedIn => "Your session has expired. Please sign in again.".to_string(),
            Self::Http(_) | Self::Rejected { .. } | Self::Parse(_) => {
                "Sign-in service unavailable. Please try again.".to_string()
            }
        }
    }
}

/// Error body returned by the provider.
#[derive(Debug, serde::Deserialize)]
pub struct ProviderErrorResponse {
    /// Nested error details.
    pub error: ProviderError,
}

/// Nested error details.
#[derive(Debug, serde::Deserialize)]
pub struct ProviderError {
    /// HTTP status code.
    #[serde(default)]
    pub code: u16,
    /// Error key, optionally followed by `" : "` and a detail.
    pub message: String,
}
