//! Remote and local gates as a peer service would use them.

mod common;

use axum::{
    Extension, Json, Router,
    http::StatusCode,
    middleware,
    routing::get,
};
use common::{body_json, client_for, get as get_request, test_env};
use filmgate::auth::{
    AuthenticatedLogin, AuthenticatedUserId, PeerAuth, require_peer_session, require_session,
};
use filmgate::identity::IdentityClient;
use tokio::net::TcpListener;
use tower::ServiceExt;

#[derive(Clone)]
struct PeerState {
    identity: IdentityClient,
}

filmgate::impl_has_identity_client!(PeerState);

async fn whoami(PeerAuth(AuthenticatedUserId(id)): PeerAuth) -> String {
    id.to_string()
}

async fn films(Extension(user): Extension<AuthenticatedUserId>) -> Json<AuthenticatedUserId> {
    Json(user)
}

fn peer_app(identity: IdentityClient) -> Router {
    let state = PeerState { identity };
    let guarded = Router::new()
        .route("/films", get(films))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_peer_session::<PeerState>,
        ));

    Router::new()
        .route("/whoami", get(whoami))
        .merge(guarded)
        .with_state(state)
}

async fn dead_client() -> IdentityClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    client_for(&format!("http://{addr}"))
}

#[tokio::test]
async fn test_peer_gate_accepts_live_session() {
    let env = test_env().await;
    let app = peer_app(env.identity_client().await);

    env.signup("alice", "hunter22").await;
    let token = env.signin("alice", "hunter22").await;

    let response = app
        .clone()
        .oneshot(get_request("/whoami", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"1");

    let response = app
        .oneshot(get_request("/films", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!(1));
}

#[tokio::test]
async fn test_peer_gate_rejects_missing_session() {
    let env = test_env().await;
    let app = peer_app(env.identity_client().await);

    let response = app
        .clone()
        .oneshot(get_request("/whoami", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(get_request("/films", Some("nosuchsession")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_peer_gate_outage_is_not_unauthenticated() {
    let app = peer_app(dead_client().await);

    let response = app
        .clone()
        .oneshot(get_request("/whoami", Some("sometoken")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Identity service unavailable");

    let response = app
        .oneshot(get_request("/films", Some("sometoken")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_peer_gate_without_cookie_skips_lookup() {
    // No cookie is a plain 401 even when the identity service is down.
    let app = peer_app(dead_client().await);

    let response = app.oneshot(get_request("/whoami", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_peer_gate_store_down_is_unauthenticated() {
    let env = test_env().await;
    let app = peer_app(env.identity_client().await);

    env.signup("alice", "hunter22").await;
    let token = env.signin("alice", "hunter22").await;
    env.session_store_down().await;

    let response = app
        .oneshot(get_request("/whoami", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_peer_gate_missing_account_is_server_error() {
    let env = test_env().await;
    let app = peer_app(env.identity_client().await);

    let session = env
        .config
        .sessions
        .create_session("ghost")
        .await
        .unwrap()
        .unwrap();

    let response = app
        .oneshot(get_request("/whoami", Some(&session.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_local_gate_middleware() {
    #[derive(Clone)]
    struct LocalState {
        sessions: std::sync::Arc<filmgate::authority::SessionAuthority>,
        db: filmgate::db::Database,
    }
    filmgate::impl_has_sessions!(LocalState);

    async fn me(Extension(user): Extension<AuthenticatedLogin>) -> Json<AuthenticatedLogin> {
        Json(user)
    }

    let env = test_env().await;
    let state = LocalState {
        sessions: env.config.sessions.clone(),
        db: env.config.db.clone(),
    };
    let app = Router::new()
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session::<LocalState>,
        ))
        .with_state(state);

    env.signup("alice", "hunter22").await;
    let token = env.signin("alice", "hunter22").await;

    let response = app
        .clone()
        .oneshot(get_request("/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["login"], "alice");
    assert_eq!(json["role"], "user");

    let response = app.oneshot(get_request("/me", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
