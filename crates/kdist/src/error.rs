//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable process exit code.

use miette::Diagnostic;
use thiserror::Error;

use kdist_config::{Config, ConfigError};
use kdist_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the backend")]
    #[diagnostic(
        code(kdist::connection_failed),
        help(
            "{reason}\n\
             Check the base URL with: kdist whoami\n\
             Raise the limit with --timeout if the backend is slow."
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Not logged in")]
    #[diagnostic(
        code(kdist::not_logged_in),
        help("Run: kdist login\nOr set KDIST_ACCESS_KEY for a one-off run.")
    )]
    NotLoggedIn,

    #[error("Invalid access key: {reason}")]
    #[diagnostic(
        code(kdist::invalid_access_key),
        help("Access keys look like ak-XXXXXXXX (letters and digits after the prefix).")
    )]
    InvalidAccessKey { reason: String },

    #[error("The backend rejected the access key: {message}")]
    #[diagnostic(
        code(kdist::auth_failed),
        help("The key may have expired or been revoked. Log in again with: kdist login")
    )]
    AuthFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("Not found: {message}")]
    #[diagnostic(code(kdist::not_found))]
    NotFound { message: String },

    #[error("Conflict: {message}")]
    #[diagnostic(code(kdist::conflict))]
    Conflict { message: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("API error ({code}): {message}")]
    #[diagnostic(code(kdist::api_error))]
    ApiError { code: i64, message: String },

    #[error("{failed} endpoint check(s) failed")]
    #[diagnostic(code(kdist::health))]
    HealthCheckFailed { failed: usize },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(kdist::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(kdist::config),
        help("Inspect the resolved values with: kdist config show")
    )]
    Config { message: String },

    #[error("Could not save the session: {message}")]
    #[diagnostic(
        code(kdist::storage),
        help("Check permissions on the session file, or pass --session-file.")
    )]
    Storage { message: String },

    // ── Interactive ──────────────────────────────────────────────────

    #[error("'{action}' needs input that was not provided")]
    #[diagnostic(
        code(kdist::non_interactive),
        help("Pass every field as a flag when not running in a terminal.\n{hint}")
    )]
    NonInteractive { action: String, hint: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(kdist::json), help("Check the JSON text and try again."))]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(kdist::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NotLoggedIn | Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::InvalidAccessKey { .. }
            | Self::Validation { .. }
            | Self::NonInteractive { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidAccessKey(e) => CliError::InvalidAccessKey {
                reason: e.to_string(),
            },
            CoreError::NotAuthenticated => CliError::NotLoggedIn,
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Config { message } => CliError::Config { message },
            CoreError::Storage { message } => CliError::Storage { message },
            CoreError::Network { message } => CliError::ConnectionFailed { reason: message },
            CoreError::Unauthorized { message } => CliError::AuthFailed { message },
            CoreError::NotFound { message } => CliError::NotFound { message },
            CoreError::Conflict { message } => CliError::Conflict { message },
            CoreError::Rejected { message, .. } => CliError::ApiError { code: 422, message },
            CoreError::Api { code, message, .. } => CliError::ApiError { code, message },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownKey(key) => CliError::Validation {
                field: key,
                reason: format!(
                    "unknown config key, expected one of: {}",
                    Config::KEYS.join(", ")
                ),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_distinct_exit_codes() {
        let cases = [
            (CoreError::NotAuthenticated, exit_code::AUTH),
            (
                CoreError::Unauthorized {
                    message: "expired".into(),
                },
                exit_code::AUTH,
            ),
            (
                CoreError::NotFound {
                    message: "no code".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::Conflict {
                    message: "taken".into(),
                },
                exit_code::CONFLICT,
            ),
            (
                CoreError::Network {
                    message: "timed out".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::Api {
                    code: 500,
                    message: "boom".into(),
                    data: None,
                },
                exit_code::GENERAL,
            ),
            (
                CoreError::ValidationFailed {
                    message: "bad".into(),
                },
                exit_code::USAGE,
            ),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn unknown_config_key_is_a_usage_error() {
        let err = CliError::from(ConfigError::UnknownKey("colour".into()));
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert!(err.to_string().contains("secure_storage"));
    }
}
