//! Shared helpers for command handlers.

use std::io::{self, IsTerminal};

use kdist_config::Config;
use kdist_core::models::PaginationParams;

use crate::cli::{GlobalOpts, OutputFormat, PageArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

/// Resolved per-run settings every handler needs.
pub struct Ctx<'a> {
    pub cfg: &'a Config,
    pub global: &'a GlobalOpts,
    pub format: OutputFormat,
    pub color: bool,
}

impl<'a> Ctx<'a> {
    pub fn new(cfg: &'a Config, global: &'a GlobalOpts) -> Self {
        Self {
            cfg,
            global,
            format: config::output_format(global, cfg),
            color: output::should_color(config::color_mode(global, cfg)),
        }
    }

    pub fn quiet(&self) -> bool {
        self.global.quiet
    }

    pub fn print(&self, out: &str) {
        output::print_output(out, self.global.quiet);
    }

    /// Status line on stderr, suppressed by `--quiet`.
    pub fn note(&self, msg: &str) {
        if !self.global.quiet {
            eprintln!("{msg}");
        }
    }
}

/// Whether prompts can be shown.
pub fn interactive() -> bool {
    io::stdin().is_terminal() && io::stderr().is_terminal()
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !interactive() {
        return Err(CliError::NonInteractive {
            action: message.into(),
            hint: "Use --yes (-y) to skip confirmation.".into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// CLI pages start at 1, the backend's at 0.
pub fn backend_page(page: &PageArgs) -> PaginationParams {
    PaginationParams::new(page.page.saturating_sub(1), page.page_size)
}
