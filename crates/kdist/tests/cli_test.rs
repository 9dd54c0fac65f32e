//! Integration tests for the `kdist` CLI binary.
//!
//! Argument parsing, help and completions run without a backend; the rest
//! drive the binary against a wiremock server with the config and session
//! files kept in a temp directory.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Isolated home: config and session files live under a temp dir.
struct Home {
    dir: TempDir,
}

impl Home {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn session_file(&self) -> PathBuf {
        self.dir.path().join("session.json")
    }

    fn config_file(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    /// Build a [`Command`] for the `kdist` binary with env isolation.
    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("kdist");
        let root: &Path = self.dir.path();
        cmd.env("HOME", root)
            .env("XDG_CONFIG_HOME", root)
            .env("XDG_DATA_HOME", root)
            .env("KDIST_CONFIG", self.config_file())
            .env("KDIST_SESSION_FILE", self.session_file())
            .env("NO_COLOR", "1")
            .env_remove("KDIST_BASE_URL")
            .env_remove("KDIST_ACCESS_KEY")
            .env_remove("KDIST_OUTPUT")
            .env_remove("KDIST_TIMEOUT")
            .env_remove("RUST_LOG");
        cmd
    }

    fn saved_session(&self) -> Value {
        serde_json::from_str(&std::fs::read_to_string(self.session_file()).unwrap()).unwrap()
    }

    fn login(&self, server: &MockServer) {
        self.cmd()
            .args(["login", "--key", "  ak-test123  ", "--base-url", &server.uri()])
            .assert()
            .success();
    }
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"code": 0, "message": "ok", "data": data}))
}

fn page(items: Value, total: u64) -> Value {
    json!({"items": items, "pagination": {"page": 0, "pageSize": 10, "total": total}})
}

fn invite_code(code: &str) -> Value {
    json!({
        "code": code, "createdAt": 1_700_000_000, "remark": "", "link": "",
        "config": {"downloadRewardDays": 3, "purchaseRewardDays": 7},
        "downloadCount": 12, "downloadReward": 36,
        "purchaseCount": 2, "purchaseReward": 14
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

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = Home::new().cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    Home::new().cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("login")
            .and(predicate::str::contains("invites"))
            .and(predicate::str::contains("grant"))
            .and(predicate::str::contains("health")),
    );
}

#[test]
fn test_invites_subcommands_exist() {
    Home::new()
        .cmd()
        .args(["invites", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("latest")
                .and(predicate::str::contains("create"))
                .and(predicate::str::contains("remark"))
                .and(predicate::str::contains("users"))
                .and(predicate::str::contains("info")),
        );
}

#[test]
fn test_completions_zsh() {
    Home::new()
        .cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_invalid_output_format() {
    let output = Home::new()
        .cmd()
        .args(["--output", "xml", "plans", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

// ── Session ─────────────────────────────────────────────────────────

#[test]
fn test_malformed_key_is_rejected_without_saving() {
    let home = Home::new();
    home.cmd()
        .args(["login", "--key", "ak-"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid access key"));
    assert!(!home.session_file().exists());
}

#[test]
fn test_commands_need_login() {
    Home::new()
        .cmd()
        .args(["plans", "list"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("kdist login"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_login_persists_trimmed_key_and_whoami_masks_it() {
    let server = MockServer::start().await;
    let home = Home::new();
    home.login(&server);

    let saved = home.saved_session();
    assert_eq!(saved["isAuthenticated"], true);
    assert_eq!(saved["accessKey"], "ak-test123");
    assert!(saved["baseUrl"].as_str().unwrap().starts_with(&server.uri()));

    let output = home.cmd().args(["-o", "json", "whoami"]).output().unwrap();
    assert!(output.status.success());
    let view: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["state"], "authenticated");
    assert_eq!(view["accessKey"], "ak-****t123");

    home.cmd().arg("logout").assert().success();
    let saved = home.saved_session();
    assert_eq!(saved["isAuthenticated"], false);
    assert_eq!(saved["accessKey"], "");
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_plans_list_sends_access_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .and(header("X-Access-Key", "ak-test123"))
        .respond_with(ok(plans()))
        .expect(1)
        .mount(&server)
        .await;

    let home = Home::new();
    home.login(&server);
    home.cmd()
        .args(["-o", "plain", "plans", "list"])
        .assert()
        .success()
        .stdout("p-month\np-year\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dashboard_summarises_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/invite/my-codes/latest"))
        .respond_with(ok(invite_code("LATEST1")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/invite/my-users"))
        .respond_with(ok(page(json!([]), 7)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .respond_with(ok(plans()))
        .mount(&server)
        .await;

    let home = Home::new();
    home.login(&server);
    let output = home.cmd().args(["-o", "json", "dashboard"]).output().unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let stats: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["total_users"], 7);
    assert_eq!(stats["total_downloads"], 12);
    assert_eq!(stats["active_plans"], 1);
    assert_eq!(stats["latest_code"], "LATEST1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_envelope_401_exits_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"code": 401, "message": "expired", "data": null}),
        ))
        .mount(&server)
        .await;

    let home = Home::new();
    home.login(&server);
    home.cmd()
        .args(["plans", "list"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("expired"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unreachable_backend_exits_with_connection_code() {
    // Bind then drop a listener so the port is known to be closed.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let home = Home::new();
    home.cmd()
        .env("KDIST_ACCESS_KEY", "ak-test123")
        .args([
            "--base-url",
            &format!("http://127.0.0.1:{port}"),
            "--timeout",
            "2",
            "plans",
            "list",
        ])
        .assert()
        .code(7);
    // An environment key never touches the saved session.
    assert!(!home.session_file().exists());
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_invites_create_prints_new_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/invite/my-codes"))
        .respond_with(ok(invite_code("NEW42")))
        .expect(1)
        .mount(&server)
        .await;

    let home = Home::new();
    home.login(&server);
    home.cmd()
        .args(["-o", "plain", "invites", "create"])
        .assert()
        .success()
        .stdout("NEW42\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_grant_dry_run_from_flags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/invite/my-codes/latest"))
        .respond_with(ok(invite_code("LATEST1")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .respond_with(ok(plans()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/retail/grant-subscription"))
        .and(body_partial_json(json!({
            "email": "buyer@example.com",
            "planPid": "p-month",
            "quantity": 3,
            "inviteCode": "LATEST1",
            "dryRun": true
        })))
        .respond_with(ok(json!({
            "user": {"uuid": "u-1", "expiredAt": 1_800_000_000, "isFirstOrderDone": false},
            "grant": {"uuid": "g-1", "planPid": "p-month", "quantity": 3, "amount": 2970,
                      "grantedAt": 1_700_000_000}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = Home::new();
    home.login(&server);
    let output = home
        .cmd()
        .args([
            "-o",
            "json",
            "grant",
            "--email",
            "buyer@example.com",
            "--plan",
            "p-month",
            "--quantity",
            "3",
            "--dry-run",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let view: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["dryRun"], true);
    assert_eq!(view["grant"]["amount"], 2970);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_grant_rejects_bad_quantity_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .respond_with(ok(plans()))
        .mount(&server)
        .await;

    let home = Home::new();
    home.login(&server);
    home.cmd()
        .args([
            "grant",
            "--email",
            "buyer@example.com",
            "--invite-code",
            "ABC",
            "--plan",
            "p-month",
            "--quantity",
            "13",
            "--yes",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Quantity cannot exceed 12"));

    let posts = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .count();
    assert_eq!(posts, 0);
}

// ── Raw requests and health ─────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_api_command_reports_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/invite/my-users"))
        .and(wiremock::matchers::query_param("inviteCode", "ABC"))
        .respond_with(ok(page(json!([]), 0)))
        .mount(&server)
        .await;

    let home = Home::new();
    home.login(&server);
    let output = home
        .cmd()
        .args(["-o", "json", "api", "get", "/api/invite/my-users", "-Q", "inviteCode=ABC"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let view: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["method"], "GET");
    assert_eq!(view["status"], 200);
    assert_eq!(view["ok"], true);
    assert_eq!(view["body"]["code"], 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_health_fails_when_an_endpoint_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .respond_with(ok(plans()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/invite/my-codes/latest"))
        .respond_with(ok(invite_code("LATEST1")))
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

    let home = Home::new();
    home.login(&server);
    home.cmd()
        .args(["-o", "plain", "health", "--delay-ms", "0"])
        .assert()
        .code(1)
        .stdout(
            predicate::str::contains("plans\tsuccess")
                .and(predicate::str::contains("invited-users\terror"))
                .and(predicate::str::contains("create-invite\tskipped")),
        );
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_set_then_show() {
    let home = Home::new();
    home.cmd()
        .args(["config", "set", "timeout", "12"])
        .assert()
        .success();
    home.cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("timeout = 12"));
    home.cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_set_rejects_unknown_key() {
    Home::new()
        .cmd()
        .args(["config", "set", "colour", "never"])
        .assert()
        .code(2);
}
