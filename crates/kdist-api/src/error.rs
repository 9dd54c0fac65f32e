use serde_json::Value;
use thiserror::Error;

use crate::access_key::AccessKeyError;

/// Application-level codes carried in the `{code, message, data}` envelope.
///
/// HTTP statuses share the same numeric space: a non-2xx response is reported
/// with its status as the code.
pub struct ErrorCode;

impl ErrorCode {
    pub const SUCCESS: i64 = 0;
    pub const UNAUTHORIZED: i64 = 401;
    pub const CONFLICT: i64 = 409;
    pub const VALIDATION_ERROR: i64 = 422;
    pub const INTERNAL_ERROR: i64 = 500;
}

/// Top-level error type for the `kdist-api` crate.
///
/// Request failures always resolve to exactly one of [`Network`](Self::Network)
/// or [`Api`](Self::Api). The remaining variants are raised locally, before
/// anything is sent.
#[derive(Debug, Error)]
pub enum Error {
    // ── Local validation ────────────────────────────────────────────
    /// The access key failed the shape check.
    #[error("Invalid access key: {0}")]
    InvalidAccessKey(#[from] AccessKeyError),

    /// The base URL or a request path could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed (TLS roots, CA file, ...).
    #[error("Transport setup failed: {0}")]
    TransportSetup(String),

    /// Query parameters, a body or a header could not be encoded.
    #[error("Request encoding failed: {0}")]
    Encode(String),

    // ── Request outcomes ────────────────────────────────────────────
    /// No response reached us: DNS, connect, timeout, or a broken body stream.
    #[error("Network error: {message}")]
    Network { code: i64, message: String },

    /// The backend answered, but with a non-2xx status or a non-zero
    /// application code.
    #[error("API error ({code}): {message}")]
    Api {
        code: i64,
        message: String,
        data: Option<Value>,
    },
}

impl Error {
    /// Build a network error. The code is always `INTERNAL_ERROR`.
    pub(crate) fn network(message: impl Into<String>) -> Self {
        Self::Network {
            code: ErrorCode::INTERNAL_ERROR,
            message: message.into(),
        }
    }

    /// The numeric code of a request failure, if this is one.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Network { code, .. } | Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` if the request never reached the backend.
    ///
    /// Only these failures are worth retrying: an `Api` error is a definite
    /// backend decision.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Returns `true` if the backend rejected the access key.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Api {
                code: ErrorCode::UNAUTHORIZED,
                ..
            }
        )
    }

    /// Returns `true` for a 404-style backend answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { code: 404, .. })
    }

    /// Raw payload attached to an `Api` error, if any.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Api { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    /// The human-readable message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Network { message, .. } | Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
