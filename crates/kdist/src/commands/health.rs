//! Endpoint status board.

use std::time::Duration;

use tabled::Tabled;

use kdist_core::{ProbeResult, ProbeStatus, Session, StatusBoard};

use crate::cli::{HealthArgs, OutputFormat};
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util::Ctx;

#[derive(Tabled)]
struct ProbeRow {
    #[tabled(rename = "Endpoint")]
    name: String,
    #[tabled(rename = "Request")]
    request: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl ProbeRow {
    fn new(r: &ProbeResult, color: bool) -> Self {
        let tone = match r.status {
            ProbeStatus::Success => Tone::Good,
            ProbeStatus::Error => Tone::Bad,
            ProbeStatus::Skipped => Tone::Muted,
        };
        let ran = r.status != ProbeStatus::Skipped;
        Self {
            name: r.name.to_owned(),
            request: format!("{} {}", r.method, r.path),
            status: output::paint(&r.status.to_string(), tone, color),
            code: r.status_code.map(|c| c.to_string()).unwrap_or_default(),
            time: if ran {
                format!("{}ms", r.response_time.as_millis())
            } else {
                String::new()
            },
            detail: r.error.clone().unwrap_or_default(),
        }
    }
}

pub async fn handle(session: &Session, args: HealthArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    let mut board = StatusBoard::new().with_delay(Duration::from_millis(args.delay_ms));
    if let Some(code) = args.code {
        board = board.with_invite_code(code);
    }

    let pb = output::spinner("Checking endpoints...", ctx.quiet());
    let report = board.run(session).await;
    pb.finish_and_clear();
    let report = report?;

    let color = ctx.color;
    let out = output::render_list(
        ctx.format,
        &report.results,
        |r| ProbeRow::new(r, color),
        |r| format!("{}\t{}", r.id, r.status),
    );
    ctx.print(&out);

    let summary = report.summary();
    if ctx.format == OutputFormat::Table {
        ctx.note(&format!(
            "{} ok, {} failed, {} skipped, mean {}ms",
            summary.success,
            summary.error,
            summary.skipped,
            summary.mean_response_time.as_millis()
        ));
    }

    if report.all_ok() {
        Ok(())
    } else {
        Err(CliError::HealthCheckFailed {
            failed: summary.error,
        })
    }
}
