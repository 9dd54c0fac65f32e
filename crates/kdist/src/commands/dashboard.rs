//! Dashboard command handler.

use kdist_core::{Console, DashboardStats};

use crate::error::CliError;
use crate::output::{self, Tone};

use super::util::Ctx;

pub async fn handle(console: &Console, ctx: &Ctx<'_>) -> Result<(), CliError> {
    let pb = output::spinner("Loading dashboard...", ctx.quiet());
    let stats = DashboardStats::load(console).await;
    pb.finish_and_clear();
    let stats = stats?;

    let color = ctx.color;
    let out = output::render_single(
        ctx.format,
        &stats,
        |s| {
            output::detail(&[
                ("Total users", s.total_users.to_string()),
                (
                    "Active users",
                    output::paint(&s.active_users.to_string(), Tone::Good, color),
                ),
                ("Downloads", s.total_downloads.to_string()),
                ("Purchases", s.total_purchases.to_string()),
                ("Plans", format!("{} active / {} total", s.active_plans, s.total_plans)),
                (
                    "Latest code",
                    s.latest_code.as_deref().map_or_else(
                        || output::paint("none", Tone::Muted, color),
                        |c| output::paint(c, Tone::Accent, color),
                    ),
                ),
            ])
        },
        |s| s.total_users.to_string(),
    );
    ctx.print(&out);
    Ok(())
}
