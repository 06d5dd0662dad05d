pub mod api;
pub mod auth;
pub mod authority;
pub mod cli;
pub mod db;
pub mod identity;
pub mod password;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use api::create_api_router;
use authority::{CsrfAuthority, SessionAuthority};
use axum::Router;
use db::Database;
use identity::IdentityState;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct ServerConfig {
    /// Account database (cloneable, uses connection pool internally)
    pub db: Database,
    /// Session tokens, backed by the session store
    pub sessions: Arc<SessionAuthority>,
    /// CSRF tokens, backed by the CSRF store
    pub csrf: Arc<CsrfAuthority>,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
}

/// Create the account-service HTTP router.
pub fn create_app(config: &ServerConfig) -> Router {
    create_api_router(
        config.db.clone(),
        config.sessions.clone(),
        config.csrf.clone(),
        config.secure_cookies,
    )
}

/// Create the identity query router served to peer services.
pub fn create_identity_app(config: &ServerConfig) -> Router {
    identity::router(IdentityState {
        sessions: config.sessions.clone(),
        db: config.db.clone(),
    })
}

/// Start the liveness probes for the session and CSRF stores.
pub fn spawn_probes(config: &ServerConfig, interval: Duration) -> Vec<JoinHandle<()>> {
    vec![
        config.sessions.store().spawn_probe(interval),
        config.csrf.store().spawn_probe(interval),
    ]
}

/// Serve `app` on the given listener until the server exits.
pub async fn run_server(app: Router, listener: TcpListener) -> Result<(), std::io::Error> {
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

async fn spawn_server(app: Router, port: u16) -> Result<(JoinHandle<()>, SocketAddr), std::io::Error> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(app, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}

/// Start the HTTP API on the given port in a background task. Use port 0 to
/// let the OS choose. Returns the address the server is listening on.
pub async fn start_server(
    config: &ServerConfig,
    port: u16,
) -> Result<(JoinHandle<()>, SocketAddr), std::io::Error> {
    spawn_server(create_app(config), port).await
}

/// Start the identity query service on the given port in a background task.
pub async fn start_identity_server(
    config: &ServerConfig,
    port: u16,
) -> Result<(JoinHandle<()>, SocketAddr), std::io::Error> {
    spawn_server(create_identity_app(config), port).await
}
