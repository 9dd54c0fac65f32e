//! Invite code command handlers.

use chrono::Utc;
use tabled::Tabled;

use kdist_core::Console;
use kdist_core::models::{InviteCode, InviteUsersParams, InvitedUser};

use crate::cli::{InvitesArgs, InvitesCommand, OutputFormat};
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util::{self, Ctx};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct InviteCodeRow {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Remark")]
    remark: String,
    #[tabled(rename = "Downloads")]
    downloads: u64,
    #[tabled(rename = "Purchases")]
    purchases: u64,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&InviteCode> for InviteCodeRow {
    fn from(c: &InviteCode) -> Self {
        Self {
            code: c.code.clone(),
            remark: c.remark.clone(),
            downloads: c.download_count,
            purchases: c.purchase_count,
            created: output::timestamp(c.created_at),
        }
    }
}

#[derive(Tabled)]
struct InvitedUserRow {
    #[tabled(rename = "UUID")]
    uuid: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "First order")]
    first_order: String,
    #[tabled(rename = "Expires")]
    expires: String,
}

impl InvitedUserRow {
    fn new(u: &InvitedUser, color: bool) -> Self {
        let now = Utc::now();
        let tone = if u.is_active_at(now) {
            Tone::Good
        } else {
            Tone::Bad
        };
        Self {
            uuid: u.uuid.clone(),
            code: u.invite_code.code.clone(),
            first_order: if u.is_first_order_done { "yes" } else { "no" }.into(),
            expires: output::paint(&output::relative(u.expired_at, now), tone, color),
        }
    }
}

fn code_detail(c: &InviteCode, color: bool) -> String {
    let mut pairs = vec![
        ("Code", output::paint(&c.code, Tone::Accent, color)),
        ("Remark", if c.remark.is_empty() { "-".into() } else { c.remark.clone() }),
        ("Created", output::timestamp(c.created_at)),
        (
            "Downloads",
            format!(
                "{} ({} reward days each, {} earned)",
                c.download_count, c.config.download_reward_days, c.download_reward
            ),
        ),
        (
            "Purchases",
            format!(
                "{} ({} reward days each, {} earned)",
                c.purchase_count, c.config.purchase_reward_days, c.purchase_reward
            ),
        ),
    ];
    if !c.link.is_empty() {
        pairs.push(("Link", c.link.clone()));
    }
    output::detail(&pairs)
}

fn print_code(ctx: &Ctx<'_>, code: &InviteCode) {
    let color = ctx.color;
    let out = output::render_single(
        ctx.format,
        code,
        |c| code_detail(c, color),
        |c| c.code.clone(),
    );
    ctx.print(&out);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(console: &Console, args: InvitesArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    match args.command {
        InvitesCommand::Latest => {
            let code = console.latest_invite_code().await?;
            print_code(ctx, &code);
            Ok(())
        }

        InvitesCommand::List(page) => {
            let params = util::backend_page(&page);
            let codes = console.invite_codes(&params).await?;
            let out = output::render_list(
                ctx.format,
                &codes.items,
                |c| InviteCodeRow::from(c),
                |c| c.code.clone(),
            );
            ctx.print(&out);
            if ctx.format == OutputFormat::Table {
                ctx.note(&output::page_footer(
                    codes.pagination.page,
                    codes.page_count(),
                    codes.pagination.total,
                ));
            }
            Ok(())
        }

        InvitesCommand::Create => {
            let pb = output::spinner("Creating invite code...", ctx.quiet());
            let code = console.create_invite_code().await;
            pb.finish_and_clear();
            let code = code?;
            ctx.note("Invite code created");
            print_code(ctx, &code);
            Ok(())
        }

        InvitesCommand::Remark { code, remark } => {
            console.update_invite_code_remark(&code, &remark).await?;
            ctx.note(&format!("Remark updated for {code}"));
            Ok(())
        }

        InvitesCommand::Users { code, page } => {
            let paging = util::backend_page(&page);
            let params = InviteUsersParams {
                page: paging.page,
                page_size: paging.page_size,
                invite_code: code.filter(|c| !c.trim().is_empty()),
            };
            let users = console.invited_users(&params).await?;
            let color = ctx.color;
            let out = output::render_list(
                ctx.format,
                &users.items,
                |u| InvitedUserRow::new(u, color),
                |u| u.uuid.clone(),
            );
            ctx.print(&out);
            if ctx.format == OutputFormat::Table {
                ctx.note(&output::page_footer(
                    users.pagination.page,
                    users.page_count(),
                    users.pagination.total,
                ));
            }
            Ok(())
        }

        InvitesCommand::Info { code } => {
            let Some(info) = console.invite_code_info(&code).await? else {
                return Err(CliError::Validation {
                    field: "code".into(),
                    reason: "invite code cannot be empty".into(),
                });
            };
            print_code(ctx, &info);
            Ok(())
        }
    }
}
