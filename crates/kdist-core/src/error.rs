// ── Core error types ──
//
// Errors surfaced by kdist-core. The `From<kdist_api::Error>` impl keeps the
// wrapper's two-way classification (no response vs backend answer) and
// lifts the well-known backend codes into their own variants so callers can
// match on meaning instead of numbers.

use serde_json::Value;
use thiserror::Error;

use kdist_api::{AccessKeyError, ErrorCode};

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Local errors ─────────────────────────────────────────────────
    #[error("{0}")]
    InvalidAccessKey(#[from] AccessKeyError),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Session storage error: {message}")]
    Storage { message: String },

    // ── Request outcomes ─────────────────────────────────────────────
    /// The request never got a response.
    #[error("Cannot reach backend: {message}")]
    Network { message: String },

    /// The backend rejected the access key.
    #[error("Authentication failed: {message}")]
    Unauthorized { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Rejected by backend: {message}")]
    Rejected { message: String, data: Option<Value> },

    /// Any other backend failure, HTTP status or application code.
    #[error("API error ({code}): {message}")]
    Api {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Numeric code of a request failure, if this is one.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Network { .. } => Some(ErrorCode::INTERNAL_ERROR),
            Self::Unauthorized { .. } => Some(ErrorCode::UNAUTHORIZED),
            Self::NotFound { .. } => Some(404),
            Self::Conflict { .. } => Some(ErrorCode::CONFLICT),
            Self::Rejected { .. } => Some(ErrorCode::VALIDATION_ERROR),
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Only failures where no response arrived are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Human-readable message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            Self::ValidationFailed { message }
            | Self::Config { message }
            | Self::Storage { message }
            | Self::Network { message }
            | Self::Unauthorized { message }
            | Self::NotFound { message }
            | Self::Conflict { message }
            | Self::Rejected { message, .. }
            | Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<kdist_api::Error> for CoreError {
    fn from(err: kdist_api::Error) -> Self {
        match err {
            kdist_api::Error::InvalidAccessKey(e) => CoreError::InvalidAccessKey(e),
            kdist_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            kdist_api::Error::TransportSetup(message) => CoreError::Config { message },
            kdist_api::Error::Encode(message) => CoreError::Internal(message),
            kdist_api::Error::Network { message, .. } => CoreError::Network { message },
            kdist_api::Error::Api {
                code,
                message,
                data,
            } => match code {
                ErrorCode::UNAUTHORIZED => CoreError::Unauthorized { message },
                404 => CoreError::NotFound { message },
                ErrorCode::CONFLICT => CoreError::Conflict { message },
                ErrorCode::VALIDATION_ERROR => CoreError::Rejected { message, data },
                _ => CoreError::Api {
                    code,
                    message,
                    data,
                },
            },
        }
    }
}

impl From<url::ParseError> for CoreError {
    fn from(err: url::ParseError) -> Self {
        CoreError::Config {
            message: format!("Invalid URL: {err}"),
        }
    }
}
