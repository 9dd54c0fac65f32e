// End-to-end tests for the session, console cache and workflows, backed by
// a wiremock server.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kdist_core::models::{InviteUsersParams, PaginationParams};
use kdist_core::{
    ClientConfig, Console, CoreError, DashboardStats, FileStorage, GrantWizard, HttpMethod,
    ManualRequest, MemoryStorage, ProbeStatus, Session, SessionStorage, StatusBoard, WizardStep,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"code": 0, "message": "ok", "data": data}))
}

fn page(items: Value, total: u64) -> Value {
    json!({"items": items, "pagination": {"page": 0, "pageSize": 10, "total": total}})
}

fn invite_code(code: &str, downloads: u64, purchases: u64) -> Value {
    json!({
        "code": code, "createdAt": 1_700_000_000, "remark": "", "link": "",
        "config": {"downloadRewardDays": 3, "purchaseRewardDays": 7},
        "downloadCount": downloads, "downloadReward": 0,
        "purchaseCount": purchases, "purchaseReward": 0
    })
}

fn plans() -> Value {
    page(
        json!([
            {"pid": "p-month", "label": "Monthly", "price": 990, "originPrice": 1290,
             "month": 1, "isActive": true},
            {"pid": "p-year", "label": "Yearly", "price": 9900, "originPrice": 12900,
             "month": 12, "isActive": false}
        ]),
        2,
    )
}

fn session_for(server: &MockServer) -> Session {
    let config = ClientConfig {
        base_url: Url::parse(&server.uri()).unwrap(),
        ..ClientConfig::default()
    };
    let session = Session::new(config.build_api().unwrap(), Arc::new(MemoryStorage::new()));
    session.login("  ak-test123  ", &server.uri()).unwrap();
    session
}

// ── Session + header ────────────────────────────────────────────────

#[tokio::test]
async fn login_then_list_plans_sends_trimmed_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .and(header("X-Access-Key", "ak-test123"))
        .respond_with(ok(plans()))
        .expect(1)
        .mount(&server)
        .await;

    let console = Console::new(session_for(&server));
    let plans = console.plans().await.unwrap();
    assert_eq!(plans.items.len(), 2);

    // Served from cache within the stale window.
    console.plans().await.unwrap();
}

#[tokio::test]
async fn anonymous_console_refuses_without_io() {
    let server = MockServer::start().await;
    let session = session_for(&server);
    session.logout();

    let console = Console::new(session);
    assert!(matches!(
        console.plans().await,
        Err(CoreError::NotAuthenticated)
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn envelope_error_code_reaches_the_caller() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 401, "message": "expired", "data": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let console = Console::new(session_for(&server));
    match console.plans().await.unwrap_err() {
        CoreError::Unauthorized { message } => assert_eq!(message, "expired"),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn session_survives_a_restart_through_file_storage() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn SessionStorage> = Arc::new(FileStorage::new(dir.path().join("s.json")));

    let api = ClientConfig::default().build_api().unwrap();
    Session::new(api, storage.clone())
        .login("ak-persist1", &server.uri())
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .and(header("X-Access-Key", "ak-persist1"))
        .respond_with(ok(plans()))
        .expect(1)
        .mount(&server)
        .await;

    let restored = Session::restore(ClientConfig::default().build_api().unwrap(), storage);
    assert!(restored.is_authenticated());
    Console::new(restored).plans().await.unwrap();
}

#[tokio::test]
async fn restored_legacy_key_is_sent_unchanged() {
    let server = MockServer::start().await;
    let storage = Arc::new(MemoryStorage::with(kdist_core::PersistedSession {
        is_authenticated: true,
        access_key: "ak-legacy-key".into(),
        base_url: server.uri(),
    }));

    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .and(header("X-Access-Key", "ak-legacy-key"))
        .respond_with(ok(plans()))
        .expect(1)
        .mount(&server)
        .await;

    let restored = Session::restore(ClientConfig::default().build_api().unwrap(), storage);
    assert!(restored.is_authenticated());
    Console::new(restored).plans().await.unwrap();
}

// ── Invalidation ────────────────────────────────────────────────────

#[tokio::test]
async fn creating_a_code_refreshes_the_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/invite/my-codes"))
        .respond_with(ok(page(json!([invite_code("OLD111", 0, 0)]), 1)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/invite/my-codes"))
        .respond_with(ok(invite_code("NEW222", 0, 0)))
        .expect(1)
        .mount(&server)
        .await;

    let console = Console::new(session_for(&server));
    let params = PaginationParams::new(0, 10);

    let before = console.invite_codes(&params).await.unwrap();
    assert_eq!(before.items.len(), 1);

    // Mounted after the first read so the refetch sees the new code.
    Mock::given(method("GET"))
        .and(path("/api/invite/my-codes"))
        .respond_with(ok(page(
            json!([invite_code("NEW222", 0, 0), invite_code("OLD111", 0, 0)]),
            2,
        )))
        .mount(&server)
        .await;

    let created = console.create_invite_code().await.unwrap();
    assert_eq!(created.code, "NEW222");
    assert!(!console.create_invite_code_mutation().state().is_pending);

    let after = console.invite_codes(&params).await.unwrap();
    let codes: Vec<_> = after.items.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["NEW222", "OLD111"]);
}

#[tokio::test]
async fn remark_update_invalidates_latest_code() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/invite/my-codes/latest"))
        .respond_with(ok(invite_code("ABC123", 1, 0)))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/invite/my-codes/ABC123/remark"))
        .and(body_partial_json(json!({"remark": "vip"})))
        .respond_with(ok(Value::Null))
        .expect(1)
        .mount(&server)
        .await;

    let console = Console::new(session_for(&server));
    console.latest_invite_code().await.unwrap();
    console.latest_invite_code().await.unwrap();
    console
        .update_invite_code_remark("ABC123", "vip")
        .await
        .unwrap();
    console.latest_invite_code().await.unwrap();
}

#[tokio::test]
async fn failed_write_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/invite/my-codes"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": 409, "message": "too many codes", "data": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let console = Console::new(session_for(&server));
    let err = console.create_invite_code().await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict { .. }));
    assert!(console.create_invite_code_mutation().state().error.is_some());
}

#[tokio::test]
async fn empty_invite_code_info_is_disabled() {
    let server = MockServer::start().await;
    let console = Console::new(session_for(&server));

    assert!(console.invite_code_info("  ").await.unwrap().is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ── Workflows ───────────────────────────────────────────────────────

#[tokio::test]
async fn dashboard_stats_from_three_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/invite/my-codes/latest"))
        .respond_with(ok(invite_code("ABC123", 42, 5)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/invite/my-users"))
        .respond_with(ok(page(
            json!([
                {"uuid": "u1", "expiredAt": 4_000_000_000_i64, "isFirstOrderDone": true,
                 "inviteCode": {"code": "ABC123", "createdAt": 0, "remark": ""}},
                {"uuid": "u2", "expiredAt": 1, "isFirstOrderDone": false,
                 "inviteCode": {"code": "ABC123", "createdAt": 0, "remark": ""}}
            ]),
            2,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .respond_with(ok(plans()))
        .mount(&server)
        .await;

    let console = Console::new(session_for(&server));
    let stats = DashboardStats::load(&console).await.unwrap();
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.active_users, 1);
    assert_eq!(stats.total_downloads, 42);
    assert_eq!(stats.total_purchases, 5);
    assert_eq!(stats.active_plans, 1);
    assert_eq!(stats.total_plans, 2);
}

#[tokio::test]
async fn wizard_grant_resets_and_invalidates_users() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/invite/my-users"))
        .respond_with(ok(page(json!([]), 0)))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/retail/grant-subscription"))
        .and(body_partial_json(json!({
            "email": "buyer@example.com", "planPid": "p-month", "quantity": 2,
            "inviteCode": "ABC123"
        })))
        .respond_with(ok(json!({
            "user": {"uuid": "u-9", "expiredAt": 4_000_000_000_i64, "isFirstOrderDone": false},
            "grant": {"uuid": "g-1", "planPid": "p-month", "quantity": 2, "amount": 1980,
                      "grantedAt": 1_700_000_000}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .respond_with(ok(plans()))
        .mount(&server)
        .await;

    let console = Console::new(session_for(&server));
    console
        .invited_users(&InviteUsersParams::default())
        .await
        .unwrap();

    let mut wizard = GrantWizard::new();
    wizard.email = "buyer@example.com".into();
    wizard.prefill_invite_code("ABC123");
    wizard.next().unwrap();
    let plan = console.plans().await.unwrap().items[0].clone();
    wizard.select_plan(plan);
    wizard.quantity = 2;
    assert_eq!(wizard.next().unwrap(), WizardStep::Review);
    assert!((wizard.total() - 19.8).abs() < 1e-9);

    let data = wizard.submit(&console).await.unwrap();
    assert_eq!(data.user.uuid, "u-9");
    assert_eq!(wizard.step(), WizardStep::UserDetails);
    assert!(wizard.email.is_empty());

    console
        .invited_users(&InviteUsersParams::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_grant_keeps_the_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/retail/grant-subscription"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "code": 422, "message": "plan unavailable", "data": null
        })))
        .mount(&server)
        .await;

    let console = Console::new(session_for(&server));
    let mut wizard = GrantWizard::new();
    wizard.email = "buyer@example.com".into();
    wizard.invite_code = "ABC123".into();
    wizard.select_plan(serde_json::from_value(json!({
        "pid": "p-month", "label": "Monthly", "price": 990, "originPrice": 990, "month": 1
    })).unwrap());

    let err = wizard.submit(&console).await.unwrap_err();
    assert!(matches!(err, CoreError::Rejected { .. }));
    assert_eq!(wizard.email, "buyer@example.com");
    assert!(wizard.plan.is_some());
}

#[tokio::test]
async fn status_board_probes_reads_and_skips_writes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .respond_with(ok(plans()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/invite/my-codes/latest"))
        .respond_with(ok(invite_code("ABC123", 0, 0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/invite/my-codes"))
        .respond_with(ok(page(json!([]), 0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/invite/my-users"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let session = session_for(&server);
    let report = StatusBoard::new()
        .with_delay(Duration::ZERO)
        .run(&session)
        .await
        .unwrap();

    let by_id = |id: &str| report.results.iter().find(|r| r.id == id).unwrap();
    assert_eq!(by_id("plans").status, ProbeStatus::Success);
    assert_eq!(by_id("plans").status_code, Some(200));
    assert_eq!(by_id("create-invite").status, ProbeStatus::Skipped);
    assert_eq!(by_id("invite-info").status, ProbeStatus::Skipped);
    assert_eq!(by_id("invited-users").status, ProbeStatus::Error);
    assert_eq!(by_id("invited-users").status_code, Some(503));

    let summary = report.summary();
    assert_eq!((summary.success, summary.error, summary.skipped), (3, 1, 2));

    let posts = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .count();
    assert_eq!(posts, 0);
}

// ── Manual requests ─────────────────────────────────────────────────

#[tokio::test]
async fn manual_request_reports_backend_failures_in_the_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/invite/my-codes/ABC/remark"))
        .and(header("X-Access-Key", "ak-test123"))
        .and(body_partial_json(json!({"remark": "vip"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"code": 409, "message": "remark locked", "data": null}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let exchange = ManualRequest::new(HttpMethod::Put, "/api/invite/my-codes/ABC/remark")
        .body_text(r#"{"remark": "vip"}"#)
        .unwrap()
        .send(&session)
        .await
        .unwrap();

    assert_eq!(exchange.status, 200);
    assert!(!exchange.is_success());
    assert_eq!(exchange.body["message"], "remark locked");
}

#[tokio::test]
async fn manual_request_needs_a_session() {
    let server = MockServer::start().await;
    let config = ClientConfig {
        base_url: Url::parse(&server.uri()).unwrap(),
        ..ClientConfig::default()
    };
    let session = Session::new(config.build_api().unwrap(), Arc::new(MemoryStorage::new()));

    let err = ManualRequest::new(HttpMethod::Get, "/api/plans")
        .send(&session)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotAuthenticated));
    assert!(server.received_requests().await.unwrap().is_empty());
}
