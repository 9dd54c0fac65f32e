// Access key validation
//
// One canonical rule, used by the login form, `ApiClient::configure` and
// `Session::login`: after trimming, `ak-` followed by one or more ASCII
// letters or digits.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Literal prefix every access key starts with.
pub const ACCESS_KEY_PREFIX: &str = "ak-";

/// Why an access key was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessKeyError {
    #[error("Access key is required")]
    Empty,
    #[error("Access key must start with \"ak-\"")]
    MissingPrefix,
    #[error("Access key must have content after \"ak-\"")]
    EmptySuffix,
    #[error("Access key must contain only letters and numbers after \"ak-\"")]
    InvalidCharacters,
}

/// Result of [`validate`], shaped for form feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub error: Option<String>,
}

/// Check an access key's shape without keeping it.
pub fn validate(raw: &str) -> Validation {
    match check(raw) {
        Ok(_) => Validation {
            valid: true,
            error: None,
        },
        Err(e) => Validation {
            valid: false,
            error: Some(e.to_string()),
        },
    }
}

/// Returns the trimmed key on success.
fn check(raw: &str) -> Result<&str, AccessKeyError> {
    if raw.is_empty() {
        return Err(AccessKeyError::Empty);
    }

    let trimmed = raw.trim();
    let Some(suffix) = trimmed.strip_prefix(ACCESS_KEY_PREFIX) else {
        return Err(AccessKeyError::MissingPrefix);
    };

    if suffix.is_empty() {
        return Err(AccessKeyError::EmptySuffix);
    }

    if !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AccessKeyError::InvalidCharacters);
    }

    Ok(trimmed)
}

/// A validated, trimmed access key.
///
/// The secret is wrapped in [`SecretString`] so it never shows up in `Debug`
/// output or tracing fields.
#[derive(Clone)]
pub struct AccessKey(SecretString);

impl AccessKey {
    /// Validate and trim `raw`.
    pub fn parse(raw: &str) -> Result<Self, AccessKeyError> {
        let trimmed = check(raw)?;
        Ok(Self(SecretString::from(trimmed.to_owned())))
    }

    /// Wrap an already-validated key without re-checking it.
    ///
    /// Used when restoring a persisted session, which trusts the validation
    /// performed at login. Whitespace is still trimmed.
    pub fn trusted(raw: &str) -> Self {
        Self(SecretString::from(raw.trim().to_owned()))
    }

    /// The raw key, for header injection and persistence.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// A display-safe form: prefix plus the last four characters.
    pub fn masked(&self) -> String {
        let key = self.expose();
        let tail: String = key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        if key.chars().count() <= ACCESS_KEY_PREFIX.len() + 4 {
            format!("{ACCESS_KEY_PREFIX}****")
        } else {
            format!("{ACCESS_KEY_PREFIX}****{tail}")
        }
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessKey").field(&self.masked()).finish()
    }
}

impl PartialEq for AccessKey {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for AccessKey {}
