//! Command dispatch: bridges CLI args -> core console -> output formatting.

pub mod api;
pub mod config_cmd;
pub mod dashboard;
pub mod grant;
pub mod health;
pub mod invites;
pub mod plans;
pub mod session;
pub mod users;
pub mod util;

use kdist_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

use self::util::Ctx;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let ctx = Ctx::new(cfg, global);
    match cmd {
        // These change the saved session, so they never use an
        // environment-supplied key.
        Command::Login(args) => session::login(&ctx, args),
        Command::Logout => session::logout(&ctx),
        Command::BaseUrl(args) => session::base_url(&ctx, args),

        Command::Whoami => session::whoami(&ctx, &config::open_session(global, cfg)?),

        cmd => {
            let console = config::open_console(global, cfg)?;
            match cmd {
                Command::Dashboard => dashboard::handle(&console, &ctx).await,
                Command::Plans(args) => plans::handle(&console, args, &ctx).await,
                Command::Invites(args) => invites::handle(&console, args, &ctx).await,
                Command::Grant(args) => grant::handle(&console, args, &ctx).await,
                Command::Users(args) => users::handle(&console, args, &ctx).await,
                Command::Api(args) => api::handle(console.session(), args, &ctx).await,
                Command::Health(args) => health::handle(console.session(), args, &ctx).await,
                Command::Login(_)
                | Command::Logout
                | Command::BaseUrl(_)
                | Command::Whoami
                | Command::Config(_)
                | Command::Completions(_) => unreachable!("handled before the console is built"),
            }
        }
    }
}
