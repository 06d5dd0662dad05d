//! CLI argument parsing, validation, and startup helpers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use crate::ServerConfig;
use crate::authority::{CsrfAuthority, SessionAuthority};
use crate::db::Database;
use crate::store::{StoreError, TokenStore};

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "filmgate",
    about = "Account service: sessions, CSRF tokens and identity lookups"
)]
pub struct Args {
    /// Port for the HTTP API
    #[arg(short, long, env = "FILMGATE_PORT", default_value = "8081")]
    pub port: u16,

    /// Port for the identity query service used by peer services
    #[arg(long, env = "FILMGATE_RPC_PORT", default_value = "50051")]
    pub rpc_port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "FILMGATE_DATABASE", default_value = "filmgate.db")]
    pub database: String,

    /// Session store URL (`redis://...` or `memory://`)
    #[arg(long, env = "FILMGATE_SESSION_STORE", default_value = "redis://127.0.0.1:6379/0")]
    pub session_store: String,

    /// CSRF token store URL (`redis://...` or `memory://`)
    #[arg(long, env = "FILMGATE_CSRF_STORE", default_value = "redis://127.0.0.1:6379/1")]
    pub csrf_store: String,

    /// Seconds between store liveness probes
    #[arg(long, env = "FILMGATE_PROBE_INTERVAL", default_value = "15", value_parser = parse_nonzero)]
    pub probe_interval_secs: u64,

    /// Timeout for a single store operation, in milliseconds
    #[arg(long, env = "FILMGATE_STORE_TIMEOUT_MS", default_value = "2000", value_parser = parse_nonzero)]
    pub store_timeout_ms: u64,

    /// Set the Secure flag on cookies (use behind HTTPS)
    #[arg(long, env = "FILMGATE_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Log output format
    #[arg(short, long, env = "FILMGATE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,
}

impl Args {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

fn parse_nonzero(s: &str) -> Result<u64, String> {
    match s.parse::<u64>() {
        Ok(0) => Err("must be greater than zero".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Startup failure. Logged by the caller, then the process exits.
#[derive(Debug)]
pub enum ConfigError {
    Store {
        namespace: &'static str,
        url: String,
        source: StoreError,
    },
    Database {
        path: String,
        source: sqlx::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Store {
                namespace,
                url,
                source,
            } => write!(f, "cannot connect {namespace} store at {url}: {source}"),
            ConfigError::Database { path, source } => {
                write!(f, "cannot open database {path}: {source}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Connect a token store, verifying it answers before returning.
pub async fn connect_store(
    url: &str,
    namespace: &'static str,
    op_timeout: Duration,
) -> Result<TokenStore, ConfigError> {
    let store = TokenStore::connect(url, namespace, op_timeout)
        .await
        .map_err(|source| ConfigError::Store {
            namespace,
            url: url.to_string(),
            source,
        })?;
    info!(namespace, url = %url, "Token store connected");
    Ok(store)
}

/// Build ServerConfig from validated arguments.
pub async fn build_config(args: &Args) -> Result<ServerConfig, ConfigError> {
    let db = Database::open(&args.database)
        .await
        .map_err(|source| ConfigError::Database {
            path: args.database.clone(),
            source,
        })?;
    info!(path = %args.database, "Database opened");

    let session_store = connect_store(&args.session_store, "session", args.store_timeout()).await?;
    let csrf_store = connect_store(&args.csrf_store, "csrf", args.store_timeout()).await?;

    Ok(ServerConfig {
        db,
        sessions: Arc::new(SessionAuthority::new(session_store)),
        csrf: Arc::new(CsrfAuthority::new(csrf_store)),
        secure_cookies: args.secure_cookies,
    })
}
