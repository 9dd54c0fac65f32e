//! Retail user command handlers.

use chrono::Utc;
use tabled::Tabled;

use kdist_core::Console;
use kdist_core::models::{GrantRecord, RetailUser, RetailUserDetail, RetailUsersParams, UserOrder};

use crate::cli::{OutputFormat, UsersArgs, UsersCommand};
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util::{self, Ctx};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "UUID")]
    uuid: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Grants")]
    grants: u32,
    #[tabled(rename = "Orders")]
    orders: u32,
    #[tabled(rename = "Expires")]
    expires: String,
}

impl UserRow {
    fn new(u: &RetailUser, color: bool) -> Self {
        let now = Utc::now();
        let tone = if u.is_expired_at(now) {
            Tone::Bad
        } else {
            Tone::Good
        };
        Self {
            uuid: u.uuid.clone(),
            email: u.email.clone(),
            grants: u.grant_count,
            orders: u.order_count,
            expires: output::paint(&output::relative(u.expired_at, now), tone, color),
        }
    }
}

#[derive(Tabled)]
struct GrantRow {
    #[tabled(rename = "Granted")]
    granted: String,
    #[tabled(rename = "Plan")]
    plan: String,
    #[tabled(rename = "Qty")]
    quantity: u32,
    #[tabled(rename = "Amount")]
    amount: String,
}

impl From<&GrantRecord> for GrantRow {
    fn from(g: &GrantRecord) -> Self {
        Self {
            granted: output::timestamp(g.granted_at),
            plan: g.plan_pid.clone(),
            quantity: g.quantity,
            amount: output::money(g.amount),
        }
    }
}

#[derive(Tabled)]
struct OrderRow {
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Paid")]
    paid: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

impl From<&UserOrder> for OrderRow {
    fn from(o: &UserOrder) -> Self {
        Self {
            created: output::timestamp(o.created_at),
            title: o.title.clone(),
            paid: o.paid_at.filter(|_| o.is_paid).map_or_else(|| "no".into(), output::timestamp),
            amount: output::money(o.pay_amount),
        }
    }
}

fn user_detail(d: &RetailUserDetail, color: bool) -> String {
    let now = Utc::now();
    let u = &d.user;
    let tone = if u.is_expired_at(now) {
        Tone::Bad
    } else {
        Tone::Good
    };
    let mut out = output::detail(&[
        ("UUID", u.uuid.clone()),
        ("Email", output::paint(&u.email, Tone::Accent, color)),
        ("Created", output::timestamp(u.created_at)),
        (
            "Expires",
            format!(
                "{} ({})",
                output::timestamp(u.expired_at),
                output::paint(&output::relative(u.expired_at, now), tone, color)
            ),
        ),
    ]);
    if !d.grants.is_empty() {
        let rows: Vec<GrantRow> = d.grants.iter().map(GrantRow::from).collect();
        out.push_str("\n\nGrants\n");
        out.push_str(&output::render_table(&rows));
    }
    if !d.orders.is_empty() {
        let rows: Vec<OrderRow> = d.orders.iter().map(OrderRow::from).collect();
        out.push_str("\n\nOrders\n");
        out.push_str(&output::render_table(&rows));
    }
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(console: &Console, args: UsersArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    match args.command {
        UsersCommand::List { email, page } => {
            let paging = util::backend_page(&page);
            let params = RetailUsersParams {
                page: paging.page,
                page_size: paging.page_size,
                email: email.filter(|e| !e.trim().is_empty()),
            };
            let users = console.retail_users(&params).await?;
            let color = ctx.color;
            let out = output::render_list(
                ctx.format,
                &users.items,
                |u| UserRow::new(u, color),
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

        UsersCommand::Show { uuid } => {
            let detail = console.retail_user_detail(&uuid).await?;
            let color = ctx.color;
            let out = output::render_single(
                ctx.format,
                detail.as_ref(),
                |d| user_detail(d, color),
                |d| d.user.uuid.clone(),
            );
            ctx.print(&out);
            Ok(())
        }
    }
}
