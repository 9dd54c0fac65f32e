//! Raw request command: the manual API tester.

use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use kdist_core::{HttpMethod, ManualRequest, RawExchange, Session};

use crate::cli::ApiArgs;
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util::Ctx;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeView<'a> {
    method: String,
    url: &'a str,
    status: u16,
    elapsed_ms: u64,
    ok: bool,
    error: Option<String>,
    body: &'a Value,
}

impl<'a> From<&'a RawExchange> for ExchangeView<'a> {
    fn from(x: &'a RawExchange) -> Self {
        Self {
            method: x.method.to_string(),
            url: &x.url,
            status: x.status,
            elapsed_ms: u64::try_from(x.elapsed.as_millis()).unwrap_or(u64::MAX),
            ok: x.is_success(),
            error: x.outcome.as_ref().map(ToString::to_string),
            body: &x.body,
        }
    }
}

fn exchange_detail(v: &ExchangeView<'_>, color: bool) -> String {
    let status = output::paint(
        &v.status.to_string(),
        if v.ok { Tone::Good } else { Tone::Bad },
        color,
    );
    let mut head = format!("{} {} -> {status} in {}ms", v.method, v.url, v.elapsed_ms);
    if let Some(ref err) = v.error {
        head.push('\n');
        head.push_str(&output::paint(err, Tone::Bad, color));
    }
    let body = serde_json::to_string_pretty(v.body).unwrap_or_else(|_| v.body.to_string());
    format!("{head}\n\n{body}")
}

pub async fn handle(session: &Session, args: ApiArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    let method = HttpMethod::from_str(&args.method).map_err(|_| CliError::Validation {
        field: "method".into(),
        reason: format!(
            "unsupported HTTP method '{}' (GET, POST, PUT, PATCH, DELETE)",
            args.method
        ),
    })?;

    let mut req = ManualRequest::new(method, args.path);
    for pair in &args.query {
        req = req.query_arg(pair)?;
    }
    if let Some(ref body) = args.body {
        req = req.body_text(body)?;
    } else if let Some(ref path) = args.body_file {
        req = req.body_text(&std::fs::read_to_string(path)?)?;
    }

    let pb = output::spinner(&format!("{method} {}", req.path), ctx.quiet());
    let exchange = req.send(session).await;
    pb.finish_and_clear();
    let exchange = exchange?;

    let view = ExchangeView::from(&exchange);
    let color = ctx.color;
    let out = output::render_single(
        ctx.format,
        &view,
        |v| exchange_detail(v, color),
        |v| serde_json::to_string(v.body).unwrap_or_default(),
    );
    ctx.print(&out);
    Ok(())
}
