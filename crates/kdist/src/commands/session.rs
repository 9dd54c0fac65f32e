//! Session command handlers: login, logout, whoami, base-url.

use std::io::{self, BufRead};

use serde::Serialize;

use kdist_core::Session;

use crate::cli::{BaseUrlArgs, LoginArgs};
use crate::config;
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util::{self, Ctx};

// ── Login / logout ──────────────────────────────────────────────────

pub fn login(ctx: &Ctx<'_>, args: LoginArgs) -> Result<(), CliError> {
    let key = match args.key {
        Some(key) => key,
        None => read_access_key()?,
    };
    let base_url = config::login_base_url(ctx.global, ctx.cfg);

    let session = config::open_saved_session(ctx.cfg)?;
    session.login(&key, &base_url)?;

    let masked = session.api().access_key_masked().unwrap_or_default();
    ctx.note(&format!(
        "Logged in to {} as {}",
        output::paint(session.base_url().as_str(), Tone::Accent, ctx.color),
        masked
    ));
    Ok(())
}

/// Prompt on a terminal, otherwise take the first line of stdin.
fn read_access_key() -> Result<String, CliError> {
    if util::interactive() {
        return rpassword::prompt_password("Access key: ").map_err(util::prompt_err);
    }
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    if line.trim().is_empty() {
        return Err(CliError::NonInteractive {
            action: "login".into(),
            hint: "Pass --key, set KDIST_ACCESS_KEY, or pipe the key on stdin.".into(),
        });
    }
    Ok(line)
}

pub fn logout(ctx: &Ctx<'_>) -> Result<(), CliError> {
    let session = config::open_saved_session(ctx.cfg)?;
    let was_authenticated = session.is_authenticated();
    session.logout();
    ctx.note(if was_authenticated {
        "Logged out"
    } else {
        "Not logged in"
    });
    Ok(())
}

// ── Base URL ────────────────────────────────────────────────────────

pub fn base_url(ctx: &Ctx<'_>, args: BaseUrlArgs) -> Result<(), CliError> {
    let session = config::open_saved_session(ctx.cfg)?;
    match args.url {
        None => ctx.print(session.base_url().as_str()),
        Some(url) => {
            session.update_base_url(&url)?;
            ctx.note(&format!("Base URL set to {}", session.base_url()));
        }
    }
    Ok(())
}

// ── Whoami ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WhoamiView {
    state: String,
    access_key: Option<String>,
    base_url: String,
    storage: String,
}

pub fn whoami(ctx: &Ctx<'_>, session: &Session) -> Result<(), CliError> {
    let snapshot = session.snapshot();
    let storage = if ctx.cfg.secure_storage {
        format!("keyring + {}", ctx.cfg.session_path().display())
    } else {
        ctx.cfg.session_path().display().to_string()
    };
    let view = WhoamiView {
        state: snapshot.state.to_string(),
        access_key: session.api().access_key_masked(),
        // Requests go wherever the client points, which `--base-url` may
        // have redirected for this run.
        base_url: session.api().base_url().to_string(),
        storage,
    };

    let color = ctx.color;
    let out = output::render_single(
        ctx.format,
        &view,
        |v| {
            let tone = if snapshot.is_authenticated() {
                Tone::Good
            } else {
                Tone::Muted
            };
            output::detail(&[
                ("State", output::paint(&v.state, tone, color)),
                ("Access key", v.access_key.clone().unwrap_or_else(|| "-".into())),
                ("Base URL", v.base_url.clone()),
                ("Storage", v.storage.clone()),
            ])
        },
        |v| v.state.clone(),
    );
    ctx.print(&out);
    Ok(())
}
