// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use fundchain_backend::{Attachment, BackendClient, CampaignSubmission};
use fundchain_core::ErrorCode;
use fundchain_model::{Address, ApprovalDecision, ApprovalStatus, CampaignId, Reward, Role, Wei};
use fundchain_policies::{LoginForm, ProfileUpdateForm, SignupForm, ValidatedCampaign};
use serde_json::{json, Value};

const TOKEN: &str = "hdr.eyJpZCI6NSwicm9sZSI6ImZ1bmRyYWlzZXIifQ.sig";
const WALLET: &str = "0x1111111111111111111111111111111111111111";

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Recorder {
    fn push(&self, route: &str, body: Value) {
        self.calls
            .lock()
            .expect("recorder lock")
            .push((route.to_string(), body));
    }

    fn last(&self, route: &str) -> Value {
        self.calls
            .lock()
            .expect("recorder lock")
            .iter()
            .rev()
            .find(|(r, _)| r == route)
            .map(|(_, body)| body.clone())
            .expect("route was called")
    }
}

type Reply = (StatusCode, Json<Value>);

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == TOKEN)
}

fn unauthorized() -> Reply {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "Invalid or expired token"})),
    )
}

async fn multipart_fields(mut multipart: Multipart) -> Value {
    let mut fields = serde_json::Map::new();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("next field") {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await.expect("file bytes");
            files.push(json!({
                "field": name,
                "file_name": file_name,
                "content_type": content_type,
                "len": bytes.len(),
            }));
        } else {
            fields.insert(name, Value::String(field.text().await.expect("text")));
        }
    }
    fields.insert("__files".to_string(), Value::Array(files));
    Value::Object(fields)
}

async fn spawn_backend() -> (String, Recorder) {
    let recorder = Recorder::default();
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
            "/isignup",
            post(
                |State(rec): State<Recorder>, Json(body): Json<Value>| async move {
                    rec.push("/isignup", body.clone());
                    match body["username"].as_str() {
                        Some("taken") => (
                            StatusCode::BAD_REQUEST,
                            Json(json!({"error": "Username already exists"})),
                        ),
                        Some("twice") => (
                            StatusCode::BAD_REQUEST,
                            Json(json!({"error": "Both username and email already exist"})),
                        ),
                        _ => (StatusCode::OK, Json(json!({"message": "created"}))),
                    }
                },
            ),
        )
        .route(
            "/fsignup",
            post(
                |State(rec): State<Recorder>, multipart: Multipart| async move {
                    rec.push("/fsignup", multipart_fields(multipart).await);
                    (StatusCode::CREATED, Json(json!({"message": "pending approval"})))
                },
            ),
        )
        .route(
            "/user",
            get(|headers: HeaderMap| async move {
                if !authorized(&headers) {
                    return unauthorized();
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "username": "fr",
                        "email": "fr@example.com",
                        "full_name": "Fund Raiser",
                        "phone_number": "0123456789",
                        "ethereum_wallet_address": WALLET,
                        "approval": "approved",
                        "user_type": "fundraiser"
                    })),
                )
            }),
        )
        .route(
            "/update",
            put(
                |State(rec): State<Recorder>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    if !authorized(&headers) {
                        return unauthorized();
                    }
                    rec.push("/update", body);
                    (StatusCode::OK, Json(json!({"message": "updated"})))
                },
            ),
        )
        .route(
            "/campaigns/:id",
            get(|Path(id): Path<String>| async move {
                if id != "7" {
                    return (
                        StatusCode::NOT_FOUND,
                        Json(json!({"error": "Campaign not found"})),
                    );
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "campaign_id": 7,
                        "title": "Clean water",
                        "description": "Wells",
                        "risk": "low",
                        "location": "Kisumu",
                        "target": 2,
                        "collected": "0.5",
                        "deadline": "2030-01-02T00:00",
                        "rewards": [{"amount": 1, "perk": "Mug"}],
                        "updates": "[{\"date\":\"2030-01-03\",\"description\":\"Dug\"}]",
                        "numberOfInvestors": 3
                    })),
                )
            }),
        )
        .route(
            "/getCampaigns",
            get(|| async {
                (
                    StatusCode::OK,
                    Json(json!([
                        {"id": "7", "title": "Clean water", "target": "2", "deadline": "2030-01-02"},
                        {"id": 8, "title": "Solar", "target": 3, "deadline": "2030-02-02"}
                    ])),
                )
            }),
        )
        .route(
            "/createCampaign",
            post(
                |State(rec): State<Recorder>, multipart: Multipart| async move {
                    rec.push("/createCampaign", multipart_fields(multipart).await);
                    (StatusCode::CREATED, Json(json!({"campaign_id": 12})))
                },
            ),
        )
        .route(
            "/fundCampaign",
            post(
                |State(rec): State<Recorder>, Json(body): Json<Value>| async move {
                    rec.push("/fundCampaign", body);
                    (StatusCode::OK, Json(json!({"message": "funded"})))
                },
            ),
        )
        .route(
            "/updateCampaign",
            post(
                |State(rec): State<Recorder>, Json(body): Json<Value>| async move {
                    rec.push("/updateCampaign", body);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"error": "database unavailable"})),
                    )
                },
            ),
        )
        .route(
            "/fundraisers",
            get(|headers: HeaderMap| async move {
                if !authorized(&headers) {
                    return unauthorized();
                }
                (
                    StatusCode::OK,
                    Json(json!([{
                        "fundraiser_id": 5,
                        "full_name": "Fund Raiser",
                        "email": "fr@example.com",
                        "approval": "pending",
                        "ver_document": [{"name": "id.pdf", "url": "/docs/id.pdf"}]
                    }])),
                )
            }),
        )
        .route(
            "/fundraisers/:id/approve",
            put(
                |State(rec): State<Recorder>,
                 headers: HeaderMap,
                 Path(id): Path<String>,
                 Json(body): Json<Value>| async move {
                    if !authorized(&headers) {
                        return unauthorized();
                    }
                    rec.push("/approve", json!({"id": id, "body": body}));
                    (StatusCode::OK, Json(json!({"message": "ok"})))
                },
            ),
        )
        .with_state(recorder.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve backend");
    });
    (format!("http://{addr}"), recorder)
}

fn client(base: &str) -> BackendClient {
    BackendClient::new(base, Duration::from_secs(5)).expect("client")
}

fn signup(username: &str) -> SignupForm {
    SignupForm {
        username: username.to_string(),
        email: "new@example.com".to_string(),
        password: "Secret#123".to_string(),
        confirm_password: "Secret#123".to_string(),
        full_name: "New Person".to_string(),
        phone_number: "0123456789".to_string(),
        ethereum_wallet_address: WALLET.to_string(),
    }
}

#[tokio::test]
async fn login_returns_token_and_bad_credentials_are_access_denied() {
    let (base, _) = spawn_backend().await;
    let backend = client(&base);
    let token = backend
        .login(&LoginForm {
            email: "fr@example.com".to_string(),
            password: "Secret#123".to_string(),
        })
        .await
        .expect("login");
    assert_eq!(token, TOKEN);

    let err = backend
        .login(&LoginForm {
            email: "fr@example.com".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .expect_err("bad password");
    assert_eq!(err.code, ErrorCode::AccessDenied);
}

#[tokio::test]
async fn investor_signup_posts_json_and_maps_conflicts_to_fields() {
    let (base, rec) = spawn_backend().await;
    let backend = client(&base);
    backend.signup_investor(&signup("fresh")).await.expect("signup");
    let sent = rec.last("/isignup");
    assert_eq!(sent["ethereum_wallet_address"], WALLET);
    assert!(sent.get("confirm_password").is_none());

    let err = backend
        .signup_investor(&signup("taken"))
        .await
        .expect_err("conflict");
    assert_eq!(err.code, ErrorCode::ValidationError);
    let fields = err.field_errors().expect("fields");
    assert!(fields.contains_key("username"));
    assert!(!fields.contains_key("email"));

    let err = backend
        .signup_investor(&signup("twice"))
        .await
        .expect_err("double conflict");
    let fields = err.field_errors().expect("fields");
    assert!(fields.contains_key("username") && fields.contains_key("email"));
}

#[tokio::test]
async fn fundraiser_signup_uploads_documents_as_files() {
    let (base, rec) = spawn_backend().await;
    client(&base)
        .signup_fundraiser(
            &signup("fr2"),
            vec![
                Attachment::new("id.pdf", b"%PDF-1.4".to_vec()),
                Attachment::new("licence.pdf", b"%PDF-1.7".to_vec()),
            ],
        )
        .await
        .expect("signup");
    let sent = rec.last("/fsignup");
    assert_eq!(sent["confirm_password"], "Secret#123");
    let files = sent["__files"].as_array().expect("files");
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f["field"] == "files"));
    assert_eq!(files[0]["content_type"], "application/pdf");
}

#[tokio::test]
async fn authorized_calls_send_the_raw_token() {
    let (base, rec) = spawn_backend().await;
    let anonymous = client(&base);
    let err = anonymous.current_user().await.expect_err("no token");
    assert_eq!(err.code, ErrorCode::AccessDenied);

    let stale = client(&base).with_token(Some("old.token.value".to_string()));
    let err = stale.current_user().await.expect_err("stale");
    assert_eq!(err.code, ErrorCode::AuthExpired);
    assert_eq!(err.details.get("status").map(String::as_str), Some("401"));

    let backend = client(&base).with_token(Some(TOKEN.to_string()));
    let profile = backend.current_user().await.expect("profile");
    assert_eq!(profile.approval_status(), ApprovalStatus::Approved);

    backend
        .update_profile(
            &ProfileUpdateForm {
                username: "fr".to_string(),
                email: "fr@example.com".to_string(),
                phone_number: "0123456789".to_string(),
            },
            None,
            Some(Role::Fundraiser),
        )
        .await
        .expect("update");
    assert_eq!(rec.last("/update")["user_type"], "fundraiser");
}

#[tokio::test]
async fn campaign_reads_tolerate_mixed_encodings() {
    let (base, _) = spawn_backend().await;
    let backend = client(&base);
    let campaign = backend
        .campaign(&CampaignId::parse("7").expect("id"))
        .await
        .expect("campaign");
    assert_eq!(campaign.id, "7");
    assert_eq!(campaign.target, "2");
    assert_eq!(campaign.update_log().entries().len(), 1);

    let err = backend
        .campaign(&CampaignId::parse("99").expect("id"))
        .await
        .expect_err("missing");
    assert_eq!(err.code, ErrorCode::NotFound);

    let all = backend.campaigns().await.expect("list");
    assert_eq!(
        all.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
        vec!["7", "8"]
    );
}

#[tokio::test]
async fn create_campaign_sends_multipart_and_returns_backend_id() {
    let (base, rec) = spawn_backend().await;
    let submission = CampaignSubmission {
        fundraiser_id: "5".to_string(),
        wallet: Address::parse(WALLET).expect("wallet"),
        campaign: ValidatedCampaign {
            title: "Clean water".to_string(),
            description: "Wells".to_string(),
            risk: "low".to_string(),
            location: "Kisumu".to_string(),
            image: "cover.png".to_string(),
            target: Wei::parse_ether("1.5").expect("target"),
            deadline: 1_893_542_400,
            rewards: vec![Reward {
                amount: "0.1".to_string(),
                perk: "Mug".to_string(),
            }],
        },
        image: Attachment::new("cover.png", vec![1, 2, 3]),
    };
    let id = client(&base)
        .create_campaign(submission)
        .await
        .expect("create");
    assert_eq!(id.as_str(), "12");

    let sent = rec.last("/createCampaign");
    assert_eq!(sent["fundraiserid"], "5");
    assert_eq!(sent["walletAddress"], WALLET);
    assert_eq!(sent["target"], "1.5");
    assert_eq!(sent["deadline"], "2030-01-02T00:00");
    assert_eq!(sent["numberOfInvestors"], "0");
    let rewards: Vec<BTreeMap<String, String>> =
        serde_json::from_str(sent["rewards"].as_str().expect("rewards")).expect("json");
    assert_eq!(rewards[0].get("perk").map(String::as_str), Some("Mug"));
    assert_eq!(sent["__files"][0]["field"], "image");
    assert_eq!(sent["__files"][0]["content_type"], "image/png");
}

#[tokio::test]
async fn fund_and_update_bodies_match_backend_field_names() {
    let (base, rec) = spawn_backend().await;
    let backend = client(&base);
    let id = CampaignId::parse("7").expect("id");
    backend
        .fund_campaign(&id, Wei::parse_ether("0.25").expect("amount"))
        .await
        .expect("fund");
    assert_eq!(
        rec.last("/fundCampaign"),
        json!({"campaign_id": "7", "amount": "0.25"})
    );

    let err = backend
        .update_campaign(&id, "2030-01-03", "Dug the first well")
        .await
        .expect_err("backend down");
    assert_eq!(err.code, ErrorCode::BackendError);
    assert_eq!(err.message, "database unavailable");
    assert_eq!(
        rec.last("/updateCampaign"),
        json!({"campaignId": "7", "updateDate": "2030-01-03", "description": "Dug the first well"})
    );
}

#[tokio::test]
async fn admin_lists_and_decides_fundraisers() {
    let (base, rec) = spawn_backend().await;
    let backend = client(&base).with_token(Some(TOKEN.to_string()));
    let fundraisers = backend.fundraisers().await.expect("list");
    assert_eq!(fundraisers.len(), 1);
    assert_eq!(fundraisers[0].id, "5");
    assert_eq!(fundraisers[0].approval_status(), ApprovalStatus::Pending);

    backend
        .set_fundraiser_approval("5", ApprovalDecision::Disapproved)
        .await
        .expect("decide");
    assert_eq!(
        rec.last("/approve"),
        json!({"id": "5", "body": {"approved": "Disapproved"}})
    );
}

#[tokio::test]
async fn unreachable_backend_is_backend_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let err = client(&format!("http://{addr}"))
        .campaigns()
        .await
        .expect_err("refused");
    assert_eq!(err.code, ErrorCode::BackendError);
    assert_eq!(
        err.details.get("endpoint").map(String::as_str),
        Some("/getCampaigns")
    );
}
