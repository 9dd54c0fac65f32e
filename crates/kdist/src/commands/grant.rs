//! Grant command: drives the three-step grant wizard from flags, prompts,
//! or a mix of both.

use dialoguer::{Input, Select};
use serde::Serialize;

use kdist_core::models::{GrantSubscriptionData, Plan};
use kdist_core::grant::Field;
use kdist_core::{Console, CoreError, FieldError, GrantWizard, WizardStep};

use crate::cli::GrantArgs;
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util::{self, Ctx};

const FLAG_HINT: &str = "Required: --email, --plan; optional: --invite-code, --quantity.";

fn missing(field: &str) -> CliError {
    CliError::NonInteractive {
        action: format!("grant ({field})"),
        hint: FLAG_HINT.into(),
    }
}

fn field_errors(errors: &[FieldError]) -> CliError {
    CliError::Validation {
        field: errors
            .iter()
            .map(|e| e.field.to_string())
            .collect::<Vec<_>>()
            .join(", "),
        reason: errors
            .iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; "),
    }
}

fn prompt_text(prompt: &str, initial: &str) -> Result<String, CliError> {
    Input::<String>::new()
        .with_prompt(prompt)
        .with_initial_text(initial)
        .allow_empty(true)
        .interact_text()
        .map_err(util::prompt_err)
}

// ── Steps ───────────────────────────────────────────────────────────

/// Step one. Interactive runs re-prompt until the prompted fields pass;
/// a bad value given as a flag fails straight away.
fn user_details(
    wizard: &mut GrantWizard,
    args: &GrantArgs,
    interactive: bool,
) -> Result<(), CliError> {
    if let Some(ref email) = args.email {
        email.clone_into(&mut wizard.email);
    }
    if let Some(ref code) = args.invite_code {
        code.clone_into(&mut wizard.invite_code);
    }
    let promptable = |field: Field| {
        interactive
            && match field {
                Field::Email => args.email.is_none(),
                Field::InviteCode => args.invite_code.is_none(),
                Field::PlanPid | Field::Quantity => false,
            }
    };

    loop {
        if promptable(Field::Email) {
            wizard.email = prompt_text("Recipient email", &wizard.email)?;
        }
        if promptable(Field::InviteCode) {
            wizard.invite_code = prompt_text("Invite code", &wizard.invite_code)?;
        }
        match wizard.next() {
            Ok(_) => return Ok(()),
            Err(errors) if errors.iter().all(|e| promptable(e.field)) => {
                for e in &errors {
                    eprintln!("  {}: {}", e.field, e.message);
                }
            }
            Err(_) if !interactive && wizard.email.trim().is_empty() => {
                return Err(missing("email"));
            }
            Err(errors) => return Err(field_errors(&errors)),
        }
    }
}

/// Step two.
fn select_plan(
    wizard: &mut GrantWizard,
    args: &GrantArgs,
    plans: &[Plan],
    interactive: bool,
) -> Result<(), CliError> {
    let active: Vec<&Plan> = plans.iter().filter(|p| p.is_active).collect();

    let plan = match args.plan {
        Some(ref pid) => plans
            .iter()
            .find(|p| p.pid == *pid)
            .ok_or_else(|| CliError::Validation {
                field: "plan".into(),
                reason: format!("no plan with pid '{pid}' (see: kdist plans list)"),
            })?,
        None if !interactive => return Err(missing("plan")),
        None => {
            if active.is_empty() {
                return Err(CliError::Validation {
                    field: "plan".into(),
                    reason: "no active plans are available".into(),
                });
            }
            let labels: Vec<String> = active
                .iter()
                .map(|p| {
                    format!(
                        "{} ({} months, {})",
                        p.display_name(),
                        p.month,
                        output::money(p.price)
                    )
                })
                .collect();
            let idx = Select::new()
                .with_prompt("Plan")
                .items(&labels)
                .default(0)
                .interact()
                .map_err(util::prompt_err)?;
            active[idx]
        }
    };
    wizard.select_plan(plan.clone());

    wizard.quantity = match args.quantity {
        Some(q) => q,
        None if interactive => Input::<u32>::new()
            .with_prompt("Quantity (1-12)")
            .default(wizard.quantity)
            .interact_text()
            .map_err(util::prompt_err)?,
        None => wizard.quantity,
    };

    wizard.next().map(drop).map_err(|e| field_errors(&e))
}

fn review(wizard: &GrantWizard, ctx: &Ctx<'_>) -> String {
    let plan = wizard
        .plan
        .as_ref()
        .map_or_else(String::new, |p| format!("{} ({})", p.display_name(), p.pid));
    let mut pairs = vec![
        ("Email", wizard.email.trim().to_owned()),
        ("Invite code", wizard.invite_code.trim().to_owned()),
        ("Plan", plan),
        ("Quantity", wizard.quantity.to_string()),
        (
            "Total",
            output::paint(&format!("{:.2}", wizard.total()), Tone::Accent, ctx.color),
        ),
    ];
    if wizard.dry_run {
        pairs.push(("Dry run", "yes".into()));
    }
    output::detail(&pairs)
}

// ── Result view ─────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GrantView {
    dry_run: bool,
    #[serde(flatten)]
    data: GrantSubscriptionData,
}

fn grant_detail(v: &GrantView, color: bool) -> String {
    let status = if v.dry_run {
        output::paint("dry run, nothing granted", Tone::Muted, color)
    } else {
        output::paint("granted", Tone::Good, color)
    };
    output::detail(&[
        ("Status", status),
        ("User", v.data.user.uuid.clone()),
        ("Expires", output::timestamp(v.data.user.expired_at)),
        ("Plan", v.data.grant.plan_pid.clone()),
        ("Quantity", v.data.grant.quantity.to_string()),
        ("Amount", output::money(v.data.grant.amount)),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(console: &Console, args: GrantArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    let interactive = util::interactive();
    let mut wizard = GrantWizard::new();
    wizard.dry_run = args.dry_run;

    if args.invite_code.is_none() {
        match console.latest_invite_code().await {
            Ok(latest) => wizard.prefill_invite_code(&latest.code),
            Err(CoreError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    }

    user_details(&mut wizard, &args, interactive)?;
    let plans = console.plans().await?;
    select_plan(&mut wizard, &args, &plans.items, interactive)?;
    debug_assert_eq!(wizard.step(), WizardStep::Review);

    if !ctx.quiet() {
        eprintln!("{}", review(&wizard, ctx));
    }
    if !wizard.dry_run && !util::confirm("Grant this subscription?", ctx.global.yes)? {
        ctx.note("Cancelled");
        return Ok(());
    }

    let dry_run = wizard.dry_run;
    let pb = output::spinner("Granting subscription...", ctx.quiet());
    let data = wizard.submit(console).await;
    pb.finish_and_clear();
    let view = GrantView {
        dry_run,
        data: data?,
    };

    let color = ctx.color;
    let out = output::render_single(
        ctx.format,
        &view,
        |v| grant_detail(v, color),
        |v| v.data.user.uuid.clone(),
    );
    ctx.print(&out);
    Ok(())
}
