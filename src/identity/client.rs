//! Client used by peer services to reach the identity service.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use url::Url;

use super::types::{
    CHECK_SESSION_PATH, CODE_ACCOUNT_NOT_FOUND, CODE_SESSION_NOT_FOUND, CODE_STORE_UNAVAILABLE,
    IDS_AND_PATHS_PATH, IdsAndPathsReply, RESOLVE_USER_ID_PATH, RpcFailure, SessionQuery,
    SessionStatusReply, UserIdReply,
};
use crate::db::IdAndPath;

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_RPC_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Failure talking to the identity service. A clean "not logged in" answer
/// is never one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The service could not be reached or the call timed out.
    Transport(String),
    /// The service answered with an unexpected failure.
    Remote {
        status: u16,
        code: String,
        message: String,
    },
    /// The session is live but its login has no account.
    AccountMissing,
    /// The answer could not be decoded.
    Decode(String),
    InvalidConfig(String),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::Transport(msg) => write!(f, "identity service unreachable: {msg}"),
            IdentityError::Remote {
                status,
                code,
                message,
            } => write!(f, "identity service error {status} ({code}): {message}"),
            IdentityError::AccountMissing => write!(f, "session login has no account"),
            IdentityError::Decode(msg) => write!(f, "malformed identity response: {msg}"),
            IdentityError::InvalidConfig(msg) => write!(f, "invalid identity client config: {msg}"),
        }
    }
}

impl std::error::Error for IdentityError {}

#[derive(Debug, Clone)]
pub struct IdentityClientConfig {
    /// Base URL of the identity listener, e.g. `http://127.0.0.1:50051`.
    /// A path prefix such as `http://gateway/auth` is kept.
    pub base_url: Url,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl IdentityClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_RPC_TIMEOUT,
            connect_timeout: DEFAULT_RPC_CONNECT_TIMEOUT,
        }
    }
}

/// Long-lived handle on the identity service.
///
/// Build once at startup and clone into request state; clones share one
/// connection pool.
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: Url,
}

impl IdentityClient {
    pub fn new(config: IdentityClientConfig) -> Result<Self, IdentityError> {
        let mut base_url = config.base_url;
        if base_url.cannot_be_a_base() {
            return Err(IdentityError::InvalidConfig(format!(
                "not a base url: {base_url}"
            )));
        }
        // Relative joins replace the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| IdentityError::InvalidConfig(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    /// Resolve a session id to the owning account id.
    ///
    /// `Ok(None)` means the caller is not authenticated: the session does not
    /// exist, or the session store is down and the service failed closed.
    pub async fn resolve_user_id(&self, session_id: &str) -> Result<Option<i64>, IdentityError> {
        let query = SessionQuery {
            session_id: session_id.to_string(),
        };
        match self
            .post::<_, UserIdReply>(RESOLVE_USER_ID_PATH, &query)
            .await?
        {
            Ok(reply) => Ok(Some(reply.user_id)),
            Err(failure) => match failure.code.as_str() {
                CODE_SESSION_NOT_FOUND => Ok(None),
                CODE_STORE_UNAVAILABLE => {
                    warn!("Identity service session store unavailable, treating as logged out");
                    Ok(None)
                }
                CODE_ACCOUNT_NOT_FOUND => Err(IdentityError::AccountMissing),
                _ => Err(failure.into_error()),
            },
        }
    }

    /// Whether the session is active. Fails closed on a down session store.
    pub async fn check_session(&self, session_id: &str) -> Result<bool, IdentityError> {
        let query = SessionQuery {
            session_id: session_id.to_string(),
        };
        match self
            .post::<_, SessionStatusReply>(CHECK_SESSION_PATH, &query)
            .await?
        {
            Ok(reply) => Ok(reply.active),
            Err(failure) if failure.code == CODE_STORE_UNAVAILABLE => Ok(false),
            Err(failure) => Err(failure.into_error()),
        }
    }

    pub async fn ids_and_paths(&self) -> Result<Vec<IdAndPath>, IdentityError> {
        let url = self.url(IDS_AND_PATHS_PATH)?;
        let response = self.http.get(url).send().await.map_err(transport_error)?;
        match decode::<IdsAndPathsReply>(response).await? {
            Ok(reply) => Ok(reply.entries),
            Err(failure) => Err(failure.into_error()),
        }
    }

    async fn post<Req, Resp>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Result<Resp, Failure>, IdentityError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.url(path)?;
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    fn url(&self, path: &str) -> Result<Url, IdentityError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| IdentityError::InvalidConfig(e.to_string()))
    }
}

/// Non-2xx answer, decoded.
struct Failure {
    status: StatusCode,
    code: String,
    message: String,
}

impl Failure {
    fn into_error(self) -> IdentityError {
        error!(status = %self.status, code = %self.code, message = %self.message, "Identity call failed");
        IdentityError::Remote {
            status: self.status.as_u16(),
            code: self.code,
            message: self.message,
        }
    }
}

fn transport_error(e: reqwest::Error) -> IdentityError {
    error!(error = %e, "Identity service unreachable");
    IdentityError::Transport(e.to_string())
}

async fn decode<Resp: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<Result<Resp, Failure>, IdentityError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<Resp>()
            .await
            .map(Ok)
            .map_err(|e| IdentityError::Decode(e.to_string()));
    }

    let text = response.text().await.map_err(transport_error)?;
    let failure = match serde_json::from_str::<RpcFailure>(&text) {
        Ok(body) => Failure {
            status,
            code: body.code,
            message: body.message,
        },
        // Not our envelope, e.g. a proxy error page.
        Err(_) => Failure {
            status,
            code: String::new(),
            message: text,
        },
    };
    debug!(status = %status, code = %failure.code, "Identity call answered with failure");
    Ok(Err(failure))
}
