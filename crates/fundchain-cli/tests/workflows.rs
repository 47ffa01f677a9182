// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use fundchain_backend::{Attachment, BackendClient};
use fundchain_chain::{
    ConfirmationPolicy, ContractAddresses, ContractCall, ContractGateway, InMemoryProvider,
    ProviderSession,
};
use fundchain_cli::{Outcome, WorkflowStep, Workflows};
use fundchain_core::{ErrorCode, ExitCode, FixedClock};
use fundchain_model::{Address, Campaign, CampaignId, Wei};
use fundchain_policies::{CampaignForm, DerivationPolicy, RewardInput, UpdateForm};
use serde_json::{json, Value};

const NOW: u64 = 1_800_000_000;
const TOKEN: &str = "hdr.eyJpZCI6NSwidXNlcm5hbWUiOiJmciIsInJvbGUiOiJmdW5kcmFpc2VyIn0.sig";

#[derive(Clone)]
struct Stub {
    approved: bool,
    fail_funding: Arc<AtomicBool>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
    switch_on_write: Arc<Mutex<Option<(Arc<InMemoryProvider>, Address)>>>,
}

impl Stub {
    fn new(approved: bool) -> Self {
        Self {
            approved,
            fail_funding: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(Mutex::new(Vec::new())),
            switch_on_write: Arc::new(Mutex::new(None)),
        }
    }

    /// The wallet moves to `next` while the backend is still handling the next write.
    fn switch_wallet_on_write(&self, provider: Arc<InMemoryProvider>, next: Address) {
        *self.switch_on_write.lock().expect("switch lock") = Some((provider, next));
    }

    async fn maybe_switch_wallet(&self) {
        let pending = self.switch_on_write.lock().expect("switch lock").take();
        if let Some((provider, next)) = pending {
            provider.switch_account(Some(next)).await;
        }
    }

    fn record(&self, route: &str, body: Value) {
        self.calls
            .lock()
            .expect("calls lock")
            .push((route.to_string(), body));
    }

    fn routes(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .map(|(r, _)| r.clone())
            .collect()
    }
}

async fn spawn_backend(stub: Stub) -> String {
    let app = Router::new()
        .route(
            "/user",
            get(|State(stub): State<Stub>| async move {
                Json(json!({
                    "username": "fr",
                    "email": "fr@example.com",
                    "approval": if stub.approved { "approved" } else { "pending" },
                    "user_type": "fundraiser"
                }))
            }),
        )
        .route(
            "/createCampaign",
            post(
                |State(stub): State<Stub>, mut multipart: Multipart| async move {
                    let mut title = String::new();
                    while let Some(field) = multipart.next_field().await.expect("field") {
                        if field.name() == Some("title") {
                            title = field.text().await.expect("title");
                        } else {
                            let _ = field.bytes().await.expect("drain");
                        }
                    }
                    stub.record("/createCampaign", json!({"title": title}));
                    stub.maybe_switch_wallet().await;
                    Json(json!({"campaign_id": 12}))
                },
            ),
        )
        .route(
            "/fundCampaign",
            post(
                |State(stub): State<Stub>, Json(body): Json<Value>| async move {
                    stub.record("/fundCampaign", body);
                    if stub.fail_funding.load(Ordering::SeqCst) {
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({"error": "database unavailable"})),
                        )
                    } else {
                        (StatusCode::OK, Json(json!({"message": "funded"})))
                    }
                },
            ),
        )
        .route(
            "/updateCampaign",
            post(
                |State(stub): State<Stub>, Json(body): Json<Value>| async move {
                    stub.record("/updateCampaign", body);
                    stub.maybe_switch_wallet().await;
                    Json(json!({"message": "updated"}))
                },
            ),
        )
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve backend");
    });
    format!("http://{addr}")
}

fn owner() -> Address {
    Address::from_bytes([0x0f; 20])
}

fn id(raw: &str) -> CampaignId {
    CampaignId::parse(raw).expect("id")
}

fn open_campaign(raw: &str) -> Campaign {
    Campaign {
        id: id(raw),
        owner: owner(),
        target: Wei::new(2_000),
        deadline: NOW + 10 * 86_400,
        amount_collected: Wei::new(500),
        target_met: false,
        refunded: false,
        last_update_date: NOW - 100,
        initial_funds_released: false,
        total_funds_released: Wei::ZERO,
        votes_in_favor: 0,
        total_investors: 1,
    }
}

async fn workflows(provider: Arc<InMemoryProvider>, backend_url: &str) -> Workflows {
    let session = ProviderSession::connect(
        provider,
        ContractAddresses {
            crowdfunding: Address::from_bytes([0xc0; 20]),
            reward_nft: None,
        },
    )
    .await
    .expect("connect");
    let clock = Arc::new(FixedClock::new(NOW));
    let gateway = ContractGateway::new(
        Arc::new(session),
        ConfirmationPolicy {
            timeout: Duration::from_millis(300),
            poll_interval: Duration::from_millis(10),
        },
        clock.clone(),
    );
    let backend = BackendClient::new(backend_url, Duration::from_secs(5))
        .expect("backend")
        .with_token(Some(TOKEN.to_string()));
    Workflows::new(backend, Arc::new(gateway), clock, DerivationPolicy::default())
}

fn campaign_form() -> CampaignForm {
    CampaignForm {
        title: "Clean water".to_string(),
        description: "Wells for the valley".to_string(),
        risk: "low".to_string(),
        location: "Kisumu".to_string(),
        image: Some("cover.png".to_string()),
        target: "2".to_string(),
        deadline: "2030-01-02T00:00".to_string(),
        rewards: vec![RewardInput {
            amount: "0.1".to_string(),
            perk: "Mug".to_string(),
        }],
    }
}

fn cover() -> Attachment {
    Attachment::new("cover.png", vec![0x89, 0x50, 0x4e, 0x47])
}

#[tokio::test]
async fn create_campaign_writes_backend_then_chain_under_backend_id() {
    let stub = Stub::new(true);
    let url = spawn_backend(stub.clone()).await;
    let provider = Arc::new(InMemoryProvider::new(1, vec![owner()]));
    let flows = workflows(provider.clone(), &url).await;

    let outcome = flows.create_campaign("5", &campaign_form(), cover()).await;
    let Outcome::Complete(created) = &outcome else {
        panic!("expected complete, got {outcome:?}");
    };
    assert_eq!(created.campaign_id, id("12"));
    assert_eq!(outcome.exit_code(), ExitCode::Success);

    let submitted = provider.submitted.lock().await;
    assert_eq!(submitted.len(), 1);
    match &submitted[0].call {
        ContractCall::CreateCampaign {
            id: chain_id,
            owner: chain_owner,
            target,
            ..
        } => {
            assert_eq!(chain_id, &id("12"));
            assert_eq!(chain_owner, &owner());
            assert_eq!(*target, Wei::parse_ether("2").expect("target"));
        }
        other => panic!("unexpected call {other:?}"),
    }
    assert_eq!(stub.routes(), vec!["/createCampaign".to_string()]);
}

#[tokio::test]
async fn chain_failure_after_backend_create_is_partial() {
    let url = spawn_backend(Stub::new(true)).await;
    let provider = Arc::new(InMemoryProvider::new(1, vec![owner()]));
    *provider.revert_reason.lock().await = Some("campaign already exists".to_string());
    let flows = workflows(provider, &url).await;

    let outcome = flows.create_campaign("5", &campaign_form(), cover()).await;
    match &outcome {
        Outcome::Partial {
            completed,
            failed,
            error,
            details,
        } => {
            assert_eq!(completed, &vec![WorkflowStep::BackendCreateCampaign]);
            assert_eq!(*failed, WorkflowStep::ChainCreateCampaign);
            assert_eq!(error.code, ErrorCode::TransactionReverted);
            assert_eq!(details.get("campaign_id").map(String::as_str), Some("12"));
        }
        other => panic!("expected partial, got {other:?}"),
    }
    assert_eq!(outcome.exit_code(), ExitCode::DependencyFailure);
    let payload = outcome.to_payload("campaigns create");
    assert_eq!(payload["status"], "partial");
    assert_eq!(payload["completed"], json!(["backend_create_campaign"]));
    assert_eq!(payload["failed"], "chain_create_campaign");
}

#[tokio::test]
async fn wallet_switch_during_backend_create_is_stale_and_never_signed() {
    let stub = Stub::new(true);
    let provider = Arc::new(InMemoryProvider::new(1, vec![owner()]));
    stub.switch_wallet_on_write(provider.clone(), Address::from_bytes([0xbb; 20]));
    let url = spawn_backend(stub.clone()).await;
    let flows = workflows(provider.clone(), &url).await;

    let outcome = flows.create_campaign("5", &campaign_form(), cover()).await;
    let Outcome::Partial {
        completed,
        failed,
        error,
        details,
    } = &outcome
    else {
        panic!("expected partial, got {outcome:?}");
    };
    assert_eq!(completed, &vec![WorkflowStep::BackendCreateCampaign]);
    assert_eq!(*failed, WorkflowStep::ChainCreateCampaign);
    assert_eq!(error.code, ErrorCode::StaleAccount);
    assert_eq!(
        error.details.get("expected_account").map(String::as_str),
        Some(owner().as_str())
    );
    assert_eq!(details.get("campaign_id").map(String::as_str), Some("12"));
    assert_eq!(provider.sign_calls.load(Ordering::SeqCst), 0);
    assert!(provider.submitted.lock().await.is_empty());
}

#[tokio::test]
async fn unapproved_fundraiser_stops_before_any_write() {
    let stub = Stub::new(false);
    let url = spawn_backend(stub.clone()).await;
    let provider = Arc::new(InMemoryProvider::new(1, vec![owner()]));
    let flows = workflows(provider.clone(), &url).await;

    let outcome = flows.create_campaign("5", &campaign_form(), cover()).await;
    match &outcome {
        Outcome::Failed { failed, error } => {
            assert_eq!(*failed, WorkflowStep::CheckApproval);
            assert_eq!(error.code, ErrorCode::AccessDenied);
        }
        other => panic!("expected failed, got {other:?}"),
    }
    assert!(stub.routes().is_empty());
    assert!(provider.submitted.lock().await.is_empty());
}

#[tokio::test]
async fn invalid_form_fails_validation_without_network() {
    let provider = Arc::new(InMemoryProvider::new(1, vec![owner()]));
    let flows = workflows(provider, "http://127.0.0.1:9").await;
    let form = CampaignForm {
        deadline: "2027-01-16T00:00".to_string(),
        ..campaign_form()
    };
    let outcome = flows.create_campaign("5", &form, cover()).await;
    let error = outcome.error().expect("error");
    assert_eq!(error.code, ErrorCode::ValidationError);
    assert!(error
        .field_errors()
        .is_some_and(|f| f.contains_key("deadline")));
    assert_eq!(outcome.exit_code(), ExitCode::Validation);
}

#[tokio::test]
async fn investment_is_recorded_by_backend_after_chain_payment() {
    let stub = Stub::new(true);
    let url = spawn_backend(stub.clone()).await;
    let provider = Arc::new(InMemoryProvider::new(1, vec![owner()]));
    provider
        .campaigns
        .lock()
        .await
        .insert(id("3"), open_campaign("3"));
    let flows = workflows(provider.clone(), &url).await;

    let outcome = flows.invest(&id("3"), "0.25").await;
    assert!(outcome.is_complete(), "{outcome:?}");
    let submitted = provider.submitted.lock().await;
    assert_eq!(submitted[0].value, Wei::parse_ether("0.25").expect("amount"));
    let calls = stub.calls.lock().expect("calls").clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1["campaign_id"], "3");
    assert_eq!(calls[0].1["amount"], "0.25");
}

#[tokio::test]
async fn zero_investment_fails_validation_without_network() {
    let provider = Arc::new(InMemoryProvider::new(1, vec![owner()]));
    let flows = workflows(provider.clone(), "http://127.0.0.1:9").await;
    provider.unavailable.store(true, Ordering::SeqCst);

    let outcome = flows.invest(&id("7"), "0").await;
    let Outcome::Failed { failed, error } = &outcome else {
        panic!("expected failed, got {outcome:?}");
    };
    assert_eq!(*failed, WorkflowStep::Validate);
    assert_eq!(error.code, ErrorCode::ValidationError);
    assert!(error.field_errors().is_some_and(|f| f.contains_key("amount")));
    assert_eq!(outcome.exit_code(), ExitCode::Validation);
}

#[tokio::test]
async fn backend_failure_after_payment_keeps_tx_hash() {
    let stub = Stub::new(true);
    stub.fail_funding.store(true, Ordering::SeqCst);
    let url = spawn_backend(stub).await;
    let provider = Arc::new(InMemoryProvider::new(1, vec![owner()]));
    provider
        .campaigns
        .lock()
        .await
        .insert(id("3"), open_campaign("3"));
    let flows = workflows(provider.clone(), &url).await;

    let outcome = flows.invest(&id("3"), "1").await;
    let Outcome::Partial {
        completed,
        failed,
        error,
        details,
    } = &outcome
    else {
        panic!("expected partial, got {outcome:?}");
    };
    assert_eq!(completed, &vec![WorkflowStep::ChainInvest]);
    assert_eq!(*failed, WorkflowStep::BackendRecordInvestment);
    assert_eq!(error.code, ErrorCode::BackendError);
    let tx_hash = provider.submitted.lock().await[0].tx_hash.to_string();
    assert_eq!(details.get("tx_hash"), Some(&tx_hash));
}

#[tokio::test]
async fn expired_campaign_refuses_investment() {
    let stub = Stub::new(true);
    let url = spawn_backend(stub.clone()).await;
    let provider = Arc::new(InMemoryProvider::new(1, vec![owner()]));
    let mut campaign = open_campaign("3");
    campaign.deadline = NOW - 1;
    provider.campaigns.lock().await.insert(id("3"), campaign);
    let flows = workflows(provider.clone(), &url).await;

    let outcome = flows.invest(&id("3"), "1").await;
    assert!(matches!(
        outcome,
        Outcome::Failed {
            failed: WorkflowStep::Validate,
            ..
        }
    ));
    assert!(provider.submitted.lock().await.is_empty());
    assert!(stub.routes().is_empty());
}

#[tokio::test]
async fn owner_update_logs_then_stamps_chain() {
    let stub = Stub::new(true);
    let url = spawn_backend(stub.clone()).await;
    let provider = Arc::new(InMemoryProvider::new(1, vec![owner()]));
    provider
        .campaigns
        .lock()
        .await
        .insert(id("3"), open_campaign("3"));
    let flows = workflows(provider.clone(), &url).await;
    let form = UpdateForm {
        update_date: "2027-02-01".to_string(),
        description: "First well dug".to_string(),
    };

    let outcome = flows.post_update(&id("3"), &form).await;
    assert!(outcome.is_complete(), "{outcome:?}");
    let calls = stub.calls.lock().expect("calls").clone();
    assert_eq!(calls[0].0, "/updateCampaign");
    assert_eq!(calls[0].1["updateDate"], "2027-02-01");
    assert!(matches!(
        provider.submitted.lock().await[0].call,
        ContractCall::AddUpdateDate { .. }
    ));
}

#[tokio::test]
async fn wallet_switch_after_owner_check_does_not_stamp_update() {
    let stub = Stub::new(true);
    let provider = Arc::new(InMemoryProvider::new(1, vec![owner()]));
    provider
        .campaigns
        .lock()
        .await
        .insert(id("3"), open_campaign("3"));
    stub.switch_wallet_on_write(provider.clone(), Address::from_bytes([0xbb; 20]));
    let url = spawn_backend(stub.clone()).await;
    let flows = workflows(provider.clone(), &url).await;
    let form = UpdateForm {
        update_date: "2027-02-01".to_string(),
        description: "First well dug".to_string(),
    };

    let outcome = flows.post_update(&id("3"), &form).await;
    let Outcome::Partial { failed, error, .. } = &outcome else {
        panic!("expected partial, got {outcome:?}");
    };
    assert_eq!(*failed, WorkflowStep::ChainMarkUpdate);
    assert_eq!(error.code, ErrorCode::StaleAccount);
    assert!(provider.submitted.lock().await.is_empty());
}

#[tokio::test]
async fn non_owner_cannot_post_update() {
    let stub = Stub::new(true);
    let url = spawn_backend(stub.clone()).await;
    let stranger = Address::from_bytes([0x44; 20]);
    let provider = Arc::new(InMemoryProvider::new(1, vec![stranger]));
    provider
        .campaigns
        .lock()
        .await
        .insert(id("3"), open_campaign("3"));
    let flows = workflows(provider, &url).await;
    let form = UpdateForm {
        update_date: "2027-02-01".to_string(),
        description: "Not mine".to_string(),
    };

    let outcome = flows.post_update(&id("3"), &form).await;
    assert_eq!(
        outcome.error().map(|e| e.code),
        Some(ErrorCode::AccessDenied)
    );
    assert!(stub.routes().is_empty());
}

#[tokio::test]
async fn single_actions_check_eligibility_on_fresh_read() {
    let url = spawn_backend(Stub::new(true)).await;
    let provider = Arc::new(InMemoryProvider::new(1, vec![owner()]));
    provider
        .campaigns
        .lock()
        .await
        .insert(id("3"), open_campaign("3"));
    let flows = workflows(provider.clone(), &url).await;

    // Target not met: no vote, no reward, and refund waits for the deadline.
    for err in [
        flows.vote(&id("3"), true).await.expect_err("vote"),
        flows.claim_reward(&id("3")).await.expect_err("claim"),
        flows.refund(&id("3")).await.expect_err("refund"),
    ] {
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
    assert!(provider.submitted.lock().await.is_empty());

    {
        let mut campaigns = provider.campaigns.lock().await;
        let campaign = campaigns.get_mut(&id("3")).expect("campaign");
        campaign.target_met = true;
        campaign.amount_collected = Wei::new(2_000);
    }
    let confirmation = flows.vote(&id("3"), false).await.expect("vote");
    assert_eq!(confirmation.subject, "3");
    assert!(matches!(
        provider.submitted.lock().await[0].call,
        ContractCall::Vote {
            in_favor: false,
            ..
        }
    ));
}
