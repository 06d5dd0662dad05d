//! Behavior while a token store is marked down.

mod common;

use axum::http::StatusCode;
use common::{csrf_header, get, post_json, session_from, test_env};

#[tokio::test]
async fn test_signin_with_session_store_down() {
    let env = test_env().await;
    env.signup("alice", "hunter22").await;
    env.session_store_down().await;

    let response = env.signin_response("alice", "hunter22").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(session_from(&response).is_none());
}

#[tokio::test]
async fn test_existing_session_reads_as_logged_out() {
    let env = test_env().await;
    env.signup("alice", "hunter22").await;
    let token = env.signin("alice", "hunter22").await;

    env.session_store_down().await;

    let response = env.send(get("/authcheck", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = env
        .send(post_json("/logout", &serde_json::json!({}), None, Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_survives_store_recovery() {
    let env = test_env().await;
    env.signup("alice", "hunter22").await;
    let token = env.signin("alice", "hunter22").await;

    env.session_store_down().await;
    assert!(!env.config.sessions.is_active(&token).await.unwrap());

    env.session_backend.set_reachable(true);
    assert!(env.config.sessions.store().probe().await);

    let response = env.send(get("/authcheck", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_csrf_endpoint_with_store_down() {
    let env = test_env().await;
    env.csrf_store_down().await;

    let response = env.send(get("/api/v1/csrf", None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(csrf_header(&response).unwrap(), "null");
}

#[tokio::test]
async fn test_csrf_rejection_with_store_down() {
    let env = test_env().await;
    let csrf = env.csrf_token().await;
    env.csrf_store_down().await;

    let body = serde_json::json!({ "login": "alice", "password": "hunter22" });
    let response = env.send(post_json("/signin", &body, Some(&csrf), None)).await;
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    assert_eq!(csrf_header(&response).unwrap(), "null");
}

#[tokio::test]
async fn test_store_error_before_probe_notices() {
    let env = test_env().await;
    env.signup("alice", "hunter22").await;
    let token = env.signin("alice", "hunter22").await;

    // The store is gone but the prober has not run yet: the call is
    // attempted and its error surfaces.
    env.session_backend.set_reachable(false);
    assert!(env.config.sessions.is_active(&token).await.is_err());

    let response = env.send(get("/authcheck", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
