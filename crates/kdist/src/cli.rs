//! Clap derive structures for the `kdist` CLI.
//!
//! Only depends on clap and clap_complete so `build.rs` can include it to
//! render man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// kdist -- distributor console for invite codes, plans and subscriptions
#[derive(Debug, Parser)]
#[command(
    name = "kdist",
    version,
    about = "Manage your distributor account from the command line",
    long_about = "Log in with a distributor access key, then inspect plans, manage invite \
        codes, grant subscriptions and browse the users who signed up through you.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend base URL (login target; redirects other commands for this run)
    #[arg(long, short = 'b', env = "KDIST_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "KDIST_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds
    #[arg(long, env = "KDIST_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Session file location
    #[arg(long, env = "KDIST_SESSION_FILE", global = true)]
    pub session_file: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in with a distributor access key
    Login(LoginArgs),

    /// Forget the saved access key
    Logout,

    /// Show the current session
    Whoami,

    /// Show or change the backend base URL of the session
    BaseUrl(BaseUrlArgs),

    /// Headline numbers: users, downloads, purchases, plans
    #[command(alias = "dash")]
    Dashboard,

    /// Subscription plans
    Plans(PlansArgs),

    /// Manage invite codes and the users they brought in
    #[command(alias = "inv", alias = "i")]
    Invites(InvitesArgs),

    /// Grant a subscription (interactive wizard unless every field is given)
    Grant(GrantArgs),

    /// Retail users you granted subscriptions to
    #[command(alias = "u")]
    Users(UsersArgs),

    /// Send a raw request to the backend
    Api(ApiArgs),

    /// Probe every read endpoint and report status and latency
    Health(HealthArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// Pagination for list commands.
#[derive(Debug, Args)]
pub struct PageArgs {
    /// Page number, starting at 1
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Results per page (1-100)
    #[arg(
        long,
        short = 'l',
        default_value = "10",
        value_parser = clap::value_parser!(u32).range(1..=100)
    )]
    pub page_size: u32,
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Access key (prompted for when omitted)
    #[arg(long, short = 'k', env = "KDIST_ACCESS_KEY", hide_env_values = true)]
    pub key: Option<String>,
}

#[derive(Debug, Args)]
pub struct BaseUrlArgs {
    /// New base URL; prints the current one when omitted
    pub url: Option<String>,
}

// ── Plans ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PlansArgs {
    #[command(subcommand)]
    pub command: PlansCommand,
}

#[derive(Debug, Subcommand)]
pub enum PlansCommand {
    /// List available plans
    #[command(alias = "ls")]
    List,
}

// ── Invites ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct InvitesArgs {
    #[command(subcommand)]
    pub command: InvitesCommand,
}

#[derive(Debug, Subcommand)]
pub enum InvitesCommand {
    /// Show your most recent invite code with its counters
    Latest,

    /// List your invite codes
    #[command(alias = "ls")]
    List(PageArgs),

    /// Create a new invite code
    Create,

    /// Set the remark on an invite code
    Remark {
        /// Invite code
        code: String,

        /// New remark (empty clears it)
        remark: String,
    },

    /// List users who signed up through your codes
    Users {
        /// Only users of this invite code
        #[arg(long, short = 'c')]
        code: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Public information about any invite code
    Info {
        /// Invite code
        code: String,
    },
}

// ── Grant ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GrantArgs {
    /// Recipient email
    #[arg(long, short = 'e')]
    pub email: Option<String>,

    /// Invite code to attribute the grant to [default: your latest code]
    #[arg(long, short = 'c')]
    pub invite_code: Option<String>,

    /// Plan pid (see `kdist plans list`)
    #[arg(long, short = 'p')]
    pub plan: Option<String>,

    /// Number of plan periods (1-12)
    #[arg(long, short = 'n')]
    pub quantity: Option<u32>,

    /// Validate and price the grant without applying it
    #[arg(long)]
    pub dry_run: bool,
}

// ── Users ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List retail users
    #[command(alias = "ls")]
    List {
        /// Filter by email
        #[arg(long, short = 'e')]
        email: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Show one user with their grants and orders
    Show {
        /// User UUID
        uuid: String,
    },
}

// ── Raw API ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ApiArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    pub method: String,

    /// Path below the base URL, e.g. /api/plans
    pub path: String,

    /// Query parameter as key=value (repeatable)
    #[arg(long, short = 'Q', value_name = "KEY=VALUE")]
    pub query: Vec<String>,

    /// JSON request body
    #[arg(long, short = 'd', conflicts_with = "body_file")]
    pub body: Option<String>,

    /// Read the JSON request body from a file
    #[arg(long, value_name = "PATH")]
    pub body_file: Option<PathBuf>,
}

// ── Health ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct HealthArgs {
    /// Also probe public info for this invite code
    #[arg(long, short = 'c')]
    pub code: Option<String>,

    /// Pause between probes in milliseconds
    #[arg(long, default_value = "200")]
    pub delay_ms: u64,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create the config file with guided setup
    Init,

    /// Display the resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Set a configuration value
    Set {
        /// Config key (base_url, timeout, output, color, secure_storage,
        /// session_file, insecure, ca_cert)
        key: String,

        /// Value to set
        value: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
