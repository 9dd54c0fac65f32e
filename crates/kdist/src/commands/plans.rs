//! Plan command handlers.

use tabled::Tabled;

use kdist_core::Console;
use kdist_core::models::Plan;

use crate::cli::{PlansArgs, PlansCommand};
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util::Ctx;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "PID")]
    pid: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Months")]
    months: u32,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "List price")]
    origin_price: String,
    #[tabled(rename = "Active")]
    active: String,
}

impl PlanRow {
    fn new(p: &Plan, color: bool) -> Self {
        let currency = p.currency.as_deref().unwrap_or("");
        Self {
            pid: p.pid.clone(),
            name: p.display_name().to_owned(),
            months: p.month,
            price: format!("{} {currency}", output::money(p.price)).trim_end().to_owned(),
            origin_price: output::money(p.origin_price),
            active: if p.is_active {
                output::paint("yes", Tone::Good, color)
            } else {
                output::paint("no", Tone::Muted, color)
            },
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(console: &Console, args: PlansArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    match args.command {
        PlansCommand::List => {
            let plans = console.plans().await?;
            let color = ctx.color;
            let out = output::render_list(
                ctx.format,
                &plans.items,
                |p| PlanRow::new(p, color),
                |p| p.pid.clone(),
            );
            ctx.print(&out);
            Ok(())
        }
    }
}
