//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Select};

use kdist_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

const OUTPUT_CHOICES: &[&str] = &["table", "json", "json-compact", "yaml", "plain"];

fn quiet_note(global: &GlobalOpts, msg: &str) {
    if !global.quiet {
        eprintln!("{msg}");
    }
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::config_path();

    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            if !util::interactive() {
                return Err(CliError::NonInteractive {
                    action: "config init".into(),
                    hint: "Use `kdist config set KEY VALUE` instead.".into(),
                });
            }
            let mut cfg = kdist_config::load_config_file(&path).unwrap_or_default();
            eprintln!("kdist configuration");
            eprintln!("   Config path: {}\n", path.display());

            let base_url: String = Input::new()
                .with_prompt("Backend base URL")
                .default(cfg.base_url.clone())
                .validate_with(|v: &String| {
                    kdist_core::parse_base_url(v)
                        .map(drop)
                        .map_err(|e| e.to_string())
                })
                .interact_text()
                .map_err(util::prompt_err)?;
            cfg.set("base_url", &base_url)?;

            let timeout: u64 = Input::new()
                .with_prompt("Request timeout (seconds)")
                .default(cfg.timeout)
                .interact_text()
                .map_err(util::prompt_err)?;
            cfg.set("timeout", &timeout.to_string())?;

            let current = OUTPUT_CHOICES
                .iter()
                .position(|c| *c == cfg.output)
                .unwrap_or(0);
            let output_idx = Select::new()
                .with_prompt("Default output format")
                .items(OUTPUT_CHOICES)
                .default(current)
                .interact()
                .map_err(util::prompt_err)?;
            cfg.set("output", OUTPUT_CHOICES[output_idx])?;

            cfg.secure_storage = Confirm::new()
                .with_prompt("Keep the access key in the system keyring?")
                .default(cfg.secure_storage)
                .interact()
                .map_err(util::prompt_err)?;

            let saved = kdist_config::save_config(&cfg)?;
            eprintln!("\n   Saved {}", saved.display());
            eprintln!("   Next: kdist login");
            Ok(())
        }

        // ── Show: resolved config ───────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::effective_config(global)
                .unwrap_or_else(|_| kdist_config::load_config_or_default());
            let format = config::output_format(global, &cfg);
            let out = match format {
                OutputFormat::Table | OutputFormat::Plain => render_toml(&cfg)?,
                _ => output::render_single(format, &cfg, |_| String::new(), |_| String::new()),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        // ── Set: edit one key in the file ───────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = kdist_config::load_config_file(&path)?;
            cfg.set(&key, &value)?;
            let saved = kdist_config::save_config(&cfg)?;
            quiet_note(global, &format!("Set {key} in {}", saved.display()));
            Ok(())
        }
    }
}

fn render_toml(cfg: &Config) -> Result<String, CliError> {
    let text = kdist_config::to_toml(cfg)?;
    Ok(text.trim_end().to_owned())
}
