//! CLI-specific config helpers: global flag overrides on top of the shared
//! `kdist_config::Config`, and construction of the session and console.

use std::sync::Arc;

use clap::ValueEnum;
use secrecy::ExposeSecret;
use tracing::debug;

use kdist_config::Config;
use kdist_core::{Console, MemoryStorage, Session};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use kdist_config::config_path;

/// Config file + environment, then global flags.
pub fn effective_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = kdist_config::load_config()?;
    if let Some(timeout) = global.timeout {
        cfg.set("timeout", &timeout.to_string())?;
    }
    if let Some(ref path) = global.session_file {
        cfg.session_file = Some(path.clone());
    }
    Ok(cfg)
}

/// `--output`, else the configured format, else table.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> OutputFormat {
    global
        .output
        .or_else(|| OutputFormat::from_str(&cfg.output, true).ok())
        .unwrap_or(OutputFormat::Table)
}

pub fn color_mode(global: &GlobalOpts, cfg: &Config) -> ColorMode {
    global
        .color
        .or_else(|| ColorMode::from_str(&cfg.color, true).ok())
        .unwrap_or(ColorMode::Auto)
}

/// The base URL a fresh login targets: `--base-url`, else config.
pub fn login_base_url(global: &GlobalOpts, cfg: &Config) -> String {
    global.base_url.clone().unwrap_or_else(|| cfg.base_url.clone())
}

/// Build the session for this run.
///
/// With `KDIST_ACCESS_KEY` set the session lives in memory only and the
/// saved one is left alone. Otherwise the saved session is restored. A
/// `--base-url` redirects requests for this run without being saved.
pub fn open_session(global: &GlobalOpts, cfg: &Config) -> Result<Session, CliError> {
    let api = kdist_config::build_api(cfg)?;

    if let Some(key) = kdist_config::resolve_access_key() {
        debug!("using access key from environment");
        let session = Session::new(api, Arc::new(MemoryStorage::new()));
        session.login(key.expose_secret(), &login_base_url(global, cfg))?;
        return Ok(session);
    }

    let session = Session::restore(api, cfg.session_storage());
    if let Some(ref raw) = global.base_url {
        let url = kdist_core::parse_base_url(raw).map_err(|e| CliError::Validation {
            field: "base-url".into(),
            reason: format!("{e}: {raw}"),
        })?;
        session.api().set_base_url(url);
    }
    Ok(session)
}

/// Session restored from storage, ignoring `KDIST_ACCESS_KEY`. Used by the
/// commands that change the saved session.
pub fn open_saved_session(cfg: &Config) -> Result<Session, CliError> {
    let api = kdist_config::build_api(cfg)?;
    Ok(Session::restore(api, cfg.session_storage()))
}

pub fn open_console(global: &GlobalOpts, cfg: &Config) -> Result<Console, CliError> {
    Ok(Console::new(open_session(global, cfg)?))
}
