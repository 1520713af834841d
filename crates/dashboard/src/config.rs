//! Dashboard configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DASHBOARD_BASE_URL` - Public URL of the dashboard (decides the `Secure` cookie flag)
//! - `BACKEND_API_URL` - Base URL of the order tracking backend
//! - `IDENTITY_API_KEY` - Identity provider web API key
//!
//! ## Optional
//! - `DASHBOARD_HOST` - Bind address (default: 127.0.0.1)
//! - `DASHBOARD_PORT` - Listen port (default: 3002)
//! - `IDENTITY_API_URL` - Identity provider base URL (default: Identity Toolkit v1)
//! - `BACKEND_API_TOKEN` - Bearer token sent to the backend
//! - `ROLE_FETCH_ATTEMPTS` - Role lookups per guard evaluation (default: 3)
//! - `ROLE_FETCH_TIMEOUT_MS` - Wait budget for a guard decision (default: 5000)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sample rates (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Default identity provider endpoint.
pub const DEFAULT_IDENTITY_API_URL: &str = "https://identitytoolkit.googleapis.com/v1";

const DEFAULT_ROLE_FETCH_ATTEMPTS: u32 = 3;
const DEFAULT_ROLE_FETCH_TIMEOUT_MS: u64 = 5_000;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Dashboard application configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the dashboard
    pub base_url: String,
    /// Identity provider settings
    pub identity: IdentityConfig,
    /// Backend API settings
    pub backend: BackendConfig,
    /// Guard resolution policy
    pub guards: GuardConfig,
    /// Emit JSON logs
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Identity provider configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Base URL, without trailing slash
    pub api_url: String,
    /// Web API key
    pub api_key: SecretString,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Backend API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL, without trailing slash
    pub api_url: String,
    /// Optional bearer token
    pub api_token: Option<SecretString>,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("api_url", &self.api_url)
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// How long and how often guards try to resolve their inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardConfig {
    /// Role lookups per evaluation, at least 1
    pub role_fetch_attempts: u32,
    /// Wait budget for a decision (session load and role lookup each)
    pub decision_timeout: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            role_fetch_attempts: DEFAULT_ROLE_FETCH_ATTEMPTS,
            decision_timeout: Duration::from_millis(DEFAULT_ROLE_FETCH_TIMEOUT_MS),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the identity API key fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("DASHBOARD_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("DASHBOARD_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("DASHBOARD_PORT", "3002")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("DASHBOARD_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_url("DASHBOARD_BASE_URL")?;

        let identity = IdentityConfig {
            api_url: get_optional_env("IDENTITY_API_URL").map_or_else(
                || Ok(DEFAULT_IDENTITY_API_URL.to_string()),
                |raw| parse_url("IDENTITY_API_URL", &raw),
            )?,
            api_key: get_validated_secret("IDENTITY_API_KEY")?,
        };

        let backend = BackendConfig {
            api_url: get_required_url("BACKEND_API_URL")?,
            api_token: get_optional_env("BACKEND_API_TOKEN").map(SecretString::from),
        };

        let guards = GuardConfig::from_env()?;
        let json_logs = get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            base_url,
            identity,
            backend,
            guards,
            json_logs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the dashboard is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl GuardConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let role_fetch_attempts = get_env_or_default(
            "ROLE_FETCH_ATTEMPTS",
            &DEFAULT_ROLE_FETCH_ATTEMPTS.to_string(),
        )
        .parse::<u32>()
        .map_err(|e| ConfigError::InvalidEnvVar("ROLE_FETCH_ATTEMPTS".to_string(), e.to_string()))?;
        if role_fetch_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ROLE_FETCH_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let timeout_ms = get_env_or_default(
            "ROLE_FETCH_TIMEOUT_MS",
            &DEFAULT_ROLE_FETCH_TIMEOUT_MS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("ROLE_FETCH_TIMEOUT_MS".to_string(), e.to_string())
        })?;

        Ok(Self {
            role_fetch_attempts,
            decision_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a required absolute URL, without trailing slash.
fn get_required_url(key: &str) -> Result<String, ConfigError> {
    let raw = get_required_env(key)?;
    parse_url(key, &raw)
}

/// Validate an absolute URL and strip the trailing slash.
fn parse_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let url = url::Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn config() -> DashboardConfig {
        DashboardConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3002,
            base_url: "http://localhost:3002".to_string(),
            identity: IdentityConfig {
                api_url: DEFAULT_IDENTITY_API_URL.to_string(),
                api_key: SecretString::from("AIzaSyD-k3y-Q9xW7vLp2mN8rT4"),
            },
            backend: BackendConfig {
                api_url: "http://localhost:5000".to_string(),
                api_token: Some(SecretString::from("backend-token-Zq81")),
            },
            guards: GuardConfig::default(),
            json_logs: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3002);
    }

    #[test]
    fn test_is_secure() {
        let mut config = config();
        assert!(!config.is_secure());
        config.base_url = "https://track.example".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_guard_defaults() {
        let guards = GuardConfig::default();
        assert_eq!(guards.role_fetch_attempts, 3);
        assert_eq!(guards.decision_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_url_strips_trailing_slash() {
        assert_eq!(
            parse_url("X", "https://api.example/v1/").unwrap(),
            "https://api.example/v1"
        );
    }

    #[test]
    fn test_parse_url_rejects_bad_input() {
        assert!(matches!(
            parse_url("X", "not a url"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            parse_url("X", "ftp://files.example"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(matches!(
            validate_secret_strength("your-api-key", "IDENTITY_API_KEY"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(matches!(
            validate_secret_strength("aaaaaaaaaaaaaaaa", "IDENTITY_API_KEY"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength("AIzaSyD-k3y-Q9xW7vLp2mN8rT4", "IDENTITY_API_KEY").is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug_output = format!("{:?}", config());
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("AIzaSyD-k3y-Q9xW7vLp2mN8rT4"));
        assert!(!debug_output.contains("backend-token-Zq81"));
        assert!(debug_output.contains("http://localhost:5000"));
    }

    #[test]
    fn test_secret_still_readable() {
        assert_eq!(
            config().identity.api_key.expose_secret(),
            "AIzaSyD-k3y-Q9xW7vLp2mN8rT4"
        );
    }
}
