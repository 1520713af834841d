//! Backend API errors.

use thiserror::Error;

/// Errors that can occur when talking to the order tracking backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The backend refused our credentials.
    #[error("Unauthorized: backend rejected the dashboard token")]
    Unauthorized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            BackendError::Api {
                status: 500,
                message: "boom".to_string()
            }
            .to_string(),
            "API error: 500 - boom"
        );
        assert_eq!(
            BackendError::RateLimited(30).to_string(),
            "Rate limited, retry after 30 seconds"
        );
    }
}
