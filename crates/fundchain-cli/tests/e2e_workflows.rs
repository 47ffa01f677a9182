// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Output;

use assert_cmd::Command;
use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

const TOKEN: &str = "hdr.eyJpZCI6NSwidXNlcm5hbWUiOiJmciIsInJvbGUiOiJmdW5kcmFpc2VyIn0.sig";
const KNOWN_TX: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve stub");
    });
    format!("http://{addr}")
}

async fn spawn_backend() -> String {
    let app = Router::new()
        .route(
            "/login",
            post(|Json(body): Json<Value>| async move {
                if body["email"] == "fr@example.com" && body["password"] == "Secret#123" {
                    (StatusCode::OK, Json(json!({"token": TOKEN})))
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"error": "Invalid credentials"})),
                    )
                }
            }),
        )
        .route(
            "/user",
            get(|headers: HeaderMap| async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|v| v == TOKEN);
                if !authorized {
                    return (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"error": "Invalid or expired token"})),
                    );
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "username": "fr",
                        "email": "fr@example.com",
                        "approval": "pending",
                        "user_type": "fundraiser"
                    })),
                )
            }),
        )
        .route(
            "/getCampaigns",
            get(|| async {
                Json(json!([
                    {"id": 1, "title": "Solar roofs", "description": "Panels", "target": "5", "deadline": "2031-01-01T00:00"},
                    {"id": 2, "title": "Clean water", "description": "Wells", "target": "2", "deadline": "2030-01-01T00:00"},
                    {"id": 3, "title": "Old drive", "description": "Water tanks", "target": "1", "deadline": "2020-01-01T00:00"}
                ]))
            }),
        );
    spawn(app).await
}

async fn spawn_explorer() -> String {
    let app = Router::new().route(
        "/api",
        get(|Query(q): Query<HashMap<String, String>>| async move {
            if q.get("txhash").map(String::as_str) == Some(KNOWN_TX) {
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": {
                        "hash": KNOWN_TX,
                        "from": "0x00112233445566778899aabbccddeeff00112233",
                        "to": "0x9999999999999999999999999999999999999999",
                        "value": "0x6f05b59d3b20000",
                        "blockNumber": "0x10"
                    }
                }))
            } else {
                Json(json!({"jsonrpc": "2.0", "id": 1, "result": null}))
            }
        }),
    );
    format!("{}/api", spawn(app).await)
}

/// Runs the binary off the async workers so the stubs keep serving.
async fn fundchain(cache: PathBuf, envs: Vec<(&'static str, String)>, args: Vec<&'static str>) -> Output {
    tokio::task::spawn_blocking(move || {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_fundchain"));
        for name in [
            "FUNDCHAIN_CONTRACT_ADDRESS",
            "FUNDCHAIN_EXPLORER_API_KEY",
            "FUNDCHAIN_LOG_LEVEL",
            "RUST_LOG",
        ] {
            cmd.env_remove(name);
        }
        cmd.env("FUNDCHAIN_CACHE_DIR", &cache);
        for (name, value) in envs {
            cmd.env(name, value);
        }
        cmd.args(args).output().expect("run fundchain")
    })
    .await
    .expect("join")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not json ({e}): {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn login_persists_token_and_scopes_actions_to_role() {
    let backend = spawn_backend().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = dir.path().to_path_buf();
    let env = || vec![("FUNDCHAIN_BACKEND_URL", backend.clone())];

    let bad = fundchain(
        cache.clone(),
        env(),
        vec!["--json", "login", "--email", "fr@example.com", "--password", "wrong"],
    )
    .await;
    assert_eq!(bad.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&bad.stderr).contains("access_denied"));
    assert!(!cache.join("auth_token").exists());

    let login = fundchain(
        cache.clone(),
        env(),
        vec!["--json", "login", "--email", "fr@example.com", "--password", "Secret#123"],
    )
    .await;
    assert!(login.status.success(), "{}", String::from_utf8_lossy(&login.stderr));
    assert_eq!(stdout_json(&login)["session"]["identity"]["role"], "fundraiser");
    assert_eq!(
        std::fs::read_to_string(cache.join("auth_token")).expect("token file"),
        TOKEN
    );

    let whoami = fundchain(cache.clone(), env(), vec!["--json", "whoami"]).await;
    let session = stdout_json(&whoami)["session"].clone();
    assert_eq!(session["state"], "authenticated");
    assert_eq!(
        session["offered_actions"],
        json!(["create_campaign", "update_campaign"])
    );

    let profile = fundchain(cache.clone(), env(), vec!["--json", "profile", "show"]).await;
    assert!(profile.status.success());
    assert_eq!(stdout_json(&profile)["approval"], "pending");

    let invest = fundchain(
        cache.clone(),
        env(),
        vec!["--json", "invest", "3", "--amount", "1"],
    )
    .await;
    assert_eq!(invest.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&invest.stderr).contains("fundraiser"));

    let logout = fundchain(cache.clone(), env(), vec!["--json", "logout"]).await;
    assert!(logout.status.success());
    let whoami = fundchain(cache, env(), vec!["--json", "whoami"]).await;
    assert_eq!(stdout_json(&whoami)["session"]["state"], "anonymous");
}

#[tokio::test(flavor = "multi_thread")]
async fn browse_filters_and_sorts_backend_campaigns() {
    let backend = spawn_backend().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let output = fundchain(
        dir.path().to_path_buf(),
        vec![("FUNDCHAIN_BACKEND_URL", backend)],
        vec![
            "--json", "campaigns", "browse", "--search", "WATER", "--active", "--sort", "target",
        ],
    )
    .await;
    assert!(output.status.success());
    let payload = stdout_json(&output);
    assert_eq!(payload["count"], 1);
    assert_eq!(payload["campaigns"][0]["title"], "Clean water");
}

#[tokio::test(flavor = "multi_thread")]
async fn track_by_hash_renders_truncated_row() {
    let explorer = spawn_explorer().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let output = fundchain(
        dir.path().to_path_buf(),
        vec![("FUNDCHAIN_EXPLORER_URL", explorer)],
        vec!["--json", "track", "--by", "hash", KNOWN_TX],
    )
    .await;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let payload = stdout_json(&output);
    assert_eq!(payload["count"], 1);
    let row = &payload["transactions"][0];
    assert_eq!(row["hash_short"], "0xaaaaaaaaaa");
    assert_eq!(row["from"], "0x00112233...ff00112233");
    assert_eq!(row["value_ether"], "0.5");
    assert_eq!(row["block"], 16);
}
