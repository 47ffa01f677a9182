// SPDX-License-Identifier: Apache-2.0

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use fundchain_backend::{SessionState, TokenStore};
use fundchain_core::ErrorCode;
use fundchain_model::Role;
use fundchain_policies::UserAction;

const NOW: u64 = 1_800_000_000;

fn token(claims: &str) -> String {
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims)
    )
}

#[test]
fn undefined_missing_and_garbage_tokens_are_anonymous() {
    for raw in [None, Some(""), Some("   "), Some("undefined"), Some("not-a-jwt")] {
        assert_eq!(SessionState::from_token(raw, NOW), SessionState::Anonymous);
    }
    let bad_json = format!("a.{}.c", URL_SAFE_NO_PAD.encode("{nope"));
    assert_eq!(
        SessionState::from_token(Some(&bad_json), NOW),
        SessionState::Anonymous
    );
}

#[test]
fn investor_token_offers_investor_actions_only() {
    let raw = token(r#"{"id":3,"username":"ivy","role":"investor","exp":1900000000}"#);
    let state = SessionState::from_token(Some(&raw), NOW);
    assert!(state.is_authenticated());
    assert_eq!(state.role(), Some(Role::Investor));
    assert!(state.offered_actions().contains(&UserAction::Vote));
    assert!(!state.offered_actions().contains(&UserAction::CreateCampaign));

    let identity = state.require(UserAction::Refund).expect("investor may refund");
    assert_eq!(identity.id, "3");

    let err = state
        .require(UserAction::ApproveFundraiser)
        .expect_err("investor is not admin");
    assert_eq!(err.code, ErrorCode::AccessDenied);
    assert_eq!(err.details.get("role").map(String::as_str), Some("investor"));
}

#[test]
fn expired_token_requires_fresh_sign_in() {
    let raw = token(r#"{"id":"9","username":"ada","role":"admin","exp":1800000000}"#);
    let state = SessionState::from_token(Some(&raw), NOW);
    assert!(matches!(state, SessionState::Expired(_)));
    assert_eq!(state.role(), None);
    assert!(state.offered_actions().is_empty());
    let err = state
        .require(UserAction::ListFundraisers)
        .expect_err("expired");
    assert_eq!(err.code, ErrorCode::AuthExpired);
    assert_eq!(
        state.require_signed_in().expect_err("expired").code,
        ErrorCode::AuthExpired
    );
}

#[test]
fn anonymous_visitor_is_asked_to_sign_in() {
    let err = SessionState::Anonymous
        .require(UserAction::Invest)
        .expect_err("anonymous");
    assert_eq!(err.code, ErrorCode::AccessDenied);
    assert_eq!(err.details.get("action").map(String::as_str), Some("invest"));
}

#[test]
fn stored_token_feeds_the_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = TokenStore::in_dir(dir.path());
    let raw = token(r#"{"id":5,"username":"fr","role":"fundraiser"}"#);
    store.save(&raw).expect("save");

    let loaded = store.load().expect("load");
    let state = SessionState::from_token(loaded.as_deref(), NOW);
    assert_eq!(state.role(), Some(Role::Fundraiser));
    assert!(state.require(UserAction::UpdateCampaign).is_ok());

    store.clear().expect("clear");
    let state = SessionState::from_token(store.load().expect("load").as_deref(), NOW);
    assert_eq!(state, SessionState::Anonymous);
}
