#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use filmgate::authority::{CsrfAuthority, SessionAuthority};
use filmgate::db::Database;
use filmgate::identity::{IdentityClient, IdentityClientConfig};
use filmgate::store::{DEFAULT_OP_TIMEOUT, KvBackend, MemoryBackend, TokenStore};
use filmgate::{ServerConfig, create_app, start_identity_server};
use tower::ServiceExt;
use url::Url;

/// Account service wired to in-memory stores and an in-memory database.
pub struct TestEnv {
    pub config: ServerConfig,
    pub session_backend: Arc<MemoryBackend>,
    pub csrf_backend: Arc<MemoryBackend>,
}

pub async fn test_env() -> TestEnv {
    let backend = Arc::new(MemoryBackend::new());
    test_env_over(backend.clone(), backend).await
}

/// Like [`test_env`], but session calls go through `session` instead of
/// straight to `session_backend`.
pub async fn test_env_over(
    session_backend: Arc<MemoryBackend>,
    session: Arc<dyn KvBackend>,
) -> TestEnv {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let session_store = TokenStore::new(session, "session", DEFAULT_OP_TIMEOUT);
    let (csrf_store, csrf_backend) = TokenStore::in_memory("csrf");
    TestEnv {
        config: ServerConfig {
            db,
            sessions: Arc::new(SessionAuthority::new(session_store)),
            csrf: Arc::new(CsrfAuthority::new(csrf_store)),
            secure_cookies: false,
        },
        session_backend,
        csrf_backend,
    }
}

impl TestEnv {
    pub fn app(&self) -> Router {
        create_app(&self.config)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app().oneshot(request).await.unwrap()
    }

    /// Take the session store offline and let the prober notice.
    pub async fn session_store_down(&self) {
        self.session_backend.set_reachable(false);
        assert!(!self.config.sessions.store().probe().await);
    }

    /// Take the CSRF store offline and let the prober notice.
    pub async fn csrf_store_down(&self) {
        self.csrf_backend.set_reachable(false);
        assert!(!self.config.csrf.store().probe().await);
    }

    pub async fn csrf_token(&self) -> String {
        let response = self.send(get("/api/v1/csrf", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        csrf_header(&response).expect("Missing CSRF token")
    }

    pub async fn signup(&self, login: &str, password: &str) -> StatusCode {
        let csrf = self.csrf_token().await;
        let body = serde_json::json!({
            "login": login,
            "password": password,
            "name": "Test User",
            "birth_date": "1990-01-01",
            "email": format!("{login}@example.com"),
        });
        self.send(post_json("/signup", &body, Some(&csrf), None))
            .await
            .status()
    }

    /// Sign in and return the session token.
    pub async fn signin(&self, login: &str, password: &str) -> String {
        let response = self.signin_response(login, password).await;
        assert_eq!(response.status(), StatusCode::OK);
        session_from(&response).expect("Missing session cookie")
    }

    pub async fn signin_response(&self, login: &str, password: &str) -> Response {
        let csrf = self.csrf_token().await;
        let body = serde_json::json!({ "login": login, "password": password });
        self.send(post_json("/signin", &body, Some(&csrf), None)).await
    }

    /// Start the identity service on a random port and connect a client to it.
    pub async fn identity_client(&self) -> IdentityClient {
        let (_handle, addr) = start_identity_server(&self.config, 0)
            .await
            .expect("Failed to start identity server");
        client_for(&format!("http://{addr}"))
    }
}

pub fn client_for(base: &str) -> IdentityClient {
    let config = IdentityClientConfig::new(Url::parse(base).unwrap());
    IdentityClient::new(config).unwrap()
}

pub fn get(uri: &str, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(session) = session {
        builder = builder.header(header::COOKIE, format!("session_id={session}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(
    uri: &str,
    body: &serde_json::Value,
    csrf: Option<&str>,
    session: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(csrf) = csrf {
        builder = builder.header("x-csrf-token", csrf);
    }
    if let Some(session) = session {
        builder = builder.header(header::COOKIE, format!("session_id={session}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn csrf_header(response: &Response) -> Option<String> {
    response
        .headers()
        .get("x-csrf-token")
        .map(|v| v.to_str().unwrap().to_string())
}

/// Session token from the response's `Set-Cookie` header.
pub fn session_from(response: &Response) -> Option<String> {
    let cookie = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    let pair = cookie.split(';').next()?;
    pair.strip_prefix("session_id=").map(str::to_string)
}

pub fn set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string())
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
