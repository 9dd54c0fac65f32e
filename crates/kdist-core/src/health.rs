// ── Endpoint status board ──
//
// Probes each known backend endpoint in turn, bypassing the query cache,
// and reports per-endpoint status and latency. Writes are never probed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use tokio::time::Instant;
use tracing::debug;

use kdist_api::models::{InviteCodeInfoParams, InviteUsersParams, PaginationParams};
use kdist_api::{ApiClient, HttpMethod, paths};

use crate::error::CoreError;
use crate::session::Session;

/// Pause between probes so the board never bursts the backend.
pub const PROBE_DELAY: Duration = Duration::from_millis(200);

const PROBE_PAGE_SIZE: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProbeStatus {
    Success,
    Error,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Plans,
    LatestInvite,
    InviteCodes,
    CreateInvite,
    InvitedUsers,
    InviteInfo,
}

impl Endpoint {
    const ALL: [Self; 6] = [
        Self::Plans,
        Self::LatestInvite,
        Self::InviteCodes,
        Self::CreateInvite,
        Self::InvitedUsers,
        Self::InviteInfo,
    ];

    fn id(self) -> &'static str {
        match self {
            Self::Plans => "plans",
            Self::LatestInvite => "latest-invite",
            Self::InviteCodes => "invite-codes",
            Self::CreateInvite => "create-invite",
            Self::InvitedUsers => "invited-users",
            Self::InviteInfo => "invite-info",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Plans => "Get Plans",
            Self::LatestInvite => "Latest Invite Code",
            Self::InviteCodes => "List Invite Codes",
            Self::CreateInvite => "Create Invite Code",
            Self::InvitedUsers => "Invited Users",
            Self::InviteInfo => "Invite Code Info",
        }
    }

    fn method(self) -> HttpMethod {
        match self {
            Self::CreateInvite => HttpMethod::Post,
            _ => HttpMethod::Get,
        }
    }

    fn path(self) -> &'static str {
        match self {
            Self::Plans => paths::PLANS,
            Self::LatestInvite => paths::INVITE_CODES_LATEST,
            Self::InviteCodes | Self::CreateInvite => paths::INVITE_CODES,
            Self::InvitedUsers => paths::INVITE_USERS,
            Self::InviteInfo => paths::INVITE_CODE_INFO,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub id: &'static str,
    pub name: &'static str,
    pub method: String,
    pub path: &'static str,
    pub status: ProbeStatus,
    #[serde(with = "millis")]
    pub response_time: Duration,
    pub status_code: Option<i64>,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

mod millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub success: usize,
    pub error: usize,
    pub skipped: usize,
    /// Mean over probes that actually ran.
    #[serde(with = "millis")]
    pub mean_response_time: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub results: Vec<ProbeResult>,
}

impl StatusReport {
    pub fn summary(&self) -> StatusSummary {
        let count = |s: ProbeStatus| self.results.iter().filter(|r| r.status == s).count();
        let ran: Vec<Duration> = self
            .results
            .iter()
            .filter(|r| r.status != ProbeStatus::Skipped)
            .map(|r| r.response_time)
            .collect();
        let mean = u32::try_from(ran.len())
            .ok()
            .filter(|n| *n > 0)
            .map_or(Duration::ZERO, |n| ran.iter().sum::<Duration>() / n);

        StatusSummary {
            success: count(ProbeStatus::Success),
            error: count(ProbeStatus::Error),
            skipped: count(ProbeStatus::Skipped),
            mean_response_time: mean,
        }
    }

    pub fn all_ok(&self) -> bool {
        self.results.iter().all(|r| r.status != ProbeStatus::Error)
    }
}

/// Sequential endpoint checker.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    delay: Duration,
    invite_code: Option<String>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self {
            delay: PROBE_DELAY,
            invite_code: None,
        }
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Also probe public invite-code info for `code`. Without one that
    /// probe is skipped.
    pub fn with_invite_code(mut self, code: impl Into<String>) -> Self {
        let code = code.into();
        self.invite_code = (!code.trim().is_empty()).then_some(code);
        self
    }

    /// Probe every endpoint. Requires an authenticated session.
    pub async fn run(&self, session: &Session) -> Result<StatusReport, CoreError> {
        let api = session.authenticated_api()?;
        let mut results = Vec::with_capacity(Endpoint::ALL.len());

        for (i, endpoint) in Endpoint::ALL.into_iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let result = self.probe(api, endpoint).await;
            debug!(endpoint = result.id, status = %result.status, "probed");
            results.push(result);
        }

        Ok(StatusReport { results })
    }

    async fn probe(&self, api: &ApiClient, endpoint: Endpoint) -> ProbeResult {
        let started = Instant::now();
        let outcome: Option<Result<(), kdist_api::Error>> = match endpoint {
            Endpoint::Plans => Some(api.list_plans().await.map(drop)),
            Endpoint::LatestInvite => Some(api.latest_invite_code().await.map(drop)),
            Endpoint::InviteCodes => Some(
                api.list_invite_codes(&PaginationParams::new(0, PROBE_PAGE_SIZE))
                    .await
                    .map(drop),
            ),
            Endpoint::CreateInvite => None,
            Endpoint::InvitedUsers => Some(
                api.list_invited_users(&InviteUsersParams {
                    page: Some(0),
                    page_size: Some(PROBE_PAGE_SIZE),
                    invite_code: None,
                })
                .await
                .map(drop),
            ),
            Endpoint::InviteInfo => match &self.invite_code {
                Some(code) => Some(
                    api.invite_code_info(&InviteCodeInfoParams { code: code.clone() })
                        .await
                        .map(drop),
                ),
                None => None,
            },
        };
        let response_time = started.elapsed();

        let (status, status_code, error) = match outcome {
            None => (
                ProbeStatus::Skipped,
                None,
                Some(skip_reason(endpoint).to_owned()),
            ),
            Some(Ok(())) => (ProbeStatus::Success, Some(200), None),
            Some(Err(e)) => (ProbeStatus::Error, e.code(), Some(e.message())),
        };

        ProbeResult {
            id: endpoint.id(),
            name: endpoint.name(),
            method: endpoint.method().to_string(),
            path: endpoint.path(),
            status,
            response_time,
            status_code,
            error,
            checked_at: Utc::now(),
        }
    }
}

fn skip_reason(endpoint: Endpoint) -> &'static str {
    match endpoint {
        Endpoint::CreateInvite => "Skipped - would create actual invite code",
        _ => "Skipped - requires specific invite code parameter",
    }
}
