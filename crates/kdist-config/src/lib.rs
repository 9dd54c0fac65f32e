//! Shared configuration for the kdist CLI.
//!
//! TOML config file, `KDIST_*` environment overrides, access-key
//! resolution, session storage selection (file or keyring), and translation
//! to `kdist_core::ClientConfig`. The CLI layers its global flags on top.

mod keyring_storage;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kdist_core::{ApiClient, ClientConfig, DEFAULT_BASE_URL, FileStorage, SessionStorage, TlsMode};

pub use keyring_storage::KeyringStorage;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "KDIST_CONFIG";
/// Environment variable carrying an access key for one-off use.
pub const ACCESS_KEY_ENV: &str = "KDIST_ACCESS_KEY";
/// Keyring service name.
pub const KEYRING_SERVICE: &str = "kdist";

const OUTPUT_FORMATS: &[&str] = &["table", "json", "json-compact", "yaml", "plain"];
const COLOR_MODES: &[&str] = &["auto", "always", "never"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error(
        "unknown config key '{0}' (expected one of: {keys})",
        keys = Config::KEYS.join(", ")
    )]
    UnknownKey(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// The `config.toml` document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Backend used for login when no `--base-url` is given.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Keep the access key in the OS keyring instead of the session file.
    #[serde(default)]
    pub secure_storage: bool,

    /// Override the session file location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,

    /// Accept invalid TLS certificates (staging backends).
    #[serde(default)]
    pub insecure: bool,

    /// Extra CA certificate to trust.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            output: default_output(),
            color: default_color(),
            secure_storage: false,
            session_file: None,
            insecure: false,
            ca_cert: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout() -> u64 {
    30
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

impl Config {
    /// Keys accepted by [`set`](Self::set), in display order.
    pub const KEYS: &'static [&'static str] = &[
        "base_url",
        "timeout",
        "output",
        "color",
        "secure_storage",
        "session_file",
        "insecure",
        "ca_cert",
    ];

    /// Set one key from its string form, validating the value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key {
            "base_url" => {
                validate_base_url(value)?;
                value.clone_into(&mut self.base_url);
            }
            "timeout" => self.timeout = parse_timeout(value)?,
            "output" => {
                one_of("output", value, OUTPUT_FORMATS)?;
                value.clone_into(&mut self.output);
            }
            "color" => {
                one_of("color", value, COLOR_MODES)?;
                value.clone_into(&mut self.color);
            }
            "secure_storage" => self.secure_storage = parse_bool("secure_storage", value)?,
            "session_file" => self.session_file = non_empty_path(value),
            "insecure" => self.insecure = parse_bool("insecure", value)?,
            "ca_cert" => self.ca_cert = non_empty_path(value),
            other => return Err(ConfigError::UnknownKey(other.into())),
        }
        Ok(())
    }

    /// Check every field that `set` would check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.base_url)?;
        if self.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        one_of("output", &self.output, OUTPUT_FORMATS)?;
        one_of("color", &self.color, COLOR_MODES)
    }

    /// Translate to the core client settings.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let base_url = validate_base_url(&self.base_url)?;
        let tls = if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca) = self.ca_cert {
            TlsMode::CustomCa(ca.clone())
        } else {
            TlsMode::System
        };
        Ok(ClientConfig {
            base_url,
            timeout: Duration::from_secs(self.timeout.max(1)),
            tls,
        })
    }

    /// Where the session record lives for this config.
    pub fn session_path(&self) -> PathBuf {
        self.session_file.clone().unwrap_or_else(default_session_path)
    }

    /// Session storage selected by `secure_storage`.
    pub fn session_storage(&self) -> Arc<dyn SessionStorage> {
        let file = FileStorage::new(self.session_path());
        if self.secure_storage {
            Arc::new(KeyringStorage::new(file))
        } else {
            Arc::new(file)
        }
    }
}

fn validate_base_url(raw: &str) -> Result<url::Url, ConfigError> {
    kdist_core::parse_base_url(raw).map_err(|e| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("{e}: {raw}"),
    })
}

fn parse_timeout(raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: format!("expected a positive number of seconds, got '{raw}'"),
        }),
    }
}

fn parse_bool(field: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("expected true or false, got '{raw}'"),
        }),
    }
}

fn one_of(field: &str, raw: &str, allowed: &[&str]) -> Result<(), ConfigError> {
    if allowed.contains(&raw) {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("expected one of {}, got '{raw}'", allowed.join(", ")),
        })
    }
}

fn non_empty_path(raw: &str) -> Option<PathBuf> {
    (!raw.is_empty()).then(|| PathBuf::from(raw))
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "kdist", "kdist")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("kdist");
    p
}

/// Resolve the config file path: `KDIST_CONFIG`, else platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default session file location, in the platform data directory.
pub fn default_session_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("session.json"),
        |dirs| dirs.data_dir().join("session.json"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load the config from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then the TOML file at `path` (if present), then `KDIST_*`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("KDIST_").ignore(&["ACCESS_KEY", "CONFIG"]));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Defaults plus the TOML file only. Used when editing the file, so
/// environment overrides are never written back.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .extract()?;
    Ok(config)
}

/// Load config, falling back to defaults on any error.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Saving ──────────────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_toml(cfg)?)?;
    Ok(())
}

/// The config as it would be written to disk.
pub fn to_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}

// ── Credential resolution ───────────────────────────────────────────

/// An access key supplied through `KDIST_ACCESS_KEY`, for runs that should
/// not touch the saved session.
pub fn resolve_access_key() -> Option<SecretString> {
    std::env::var(ACCESS_KEY_ENV)
        .ok()
        .filter(|val| !val.trim().is_empty())
        .map(SecretString::from)
}

/// Build the shared API client for `cfg`.
pub fn build_api(cfg: &Config) -> Result<Arc<ApiClient>, ConfigError> {
    let client = cfg.client_config()?;
    client.build_api().map_err(|e| ConfigError::Validation {
        field: "transport".into(),
        reason: e.to_string(),
    })
}
