//! Identity query endpoints hosted by the account service.
//!
//! - POST `/identity/v1/resolve-user-id` - session id -> numeric user id
//! - POST `/identity/v1/check-session` - session id -> active flag
//! - GET `/identity/v1/ids-and-paths` - every account id with its avatar path

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::{debug, error};

use super::types::{
    CHECK_SESSION_PATH, CODE_ACCOUNT_NOT_FOUND, CODE_INTERNAL, CODE_SESSION_NOT_FOUND,
    CODE_STORE_UNAVAILABLE, IDS_AND_PATHS_PATH, IdsAndPathsReply, RESOLVE_USER_ID_PATH,
    RpcFailure, SessionQuery, SessionStatusReply, UserIdReply,
};
use crate::authority::SessionAuthority;
use crate::db::Database;
use crate::store::Lookup;

#[derive(Clone)]
pub struct IdentityState {
    pub sessions: Arc<SessionAuthority>,
    pub db: Database,
}

pub fn router(state: IdentityState) -> Router {
    Router::new()
        .route(RESOLVE_USER_ID_PATH, post(resolve_user_id))
        .route(CHECK_SESSION_PATH, post(check_session))
        .route(IDS_AND_PATHS_PATH, get(ids_and_paths))
        .with_state(state)
}

/// Failure answers of the identity service.
#[derive(Debug)]
pub enum RpcError {
    SessionNotFound,
    AccountNotFound,
    StoreUnavailable,
    Internal(String),
}

impl RpcError {
    fn internal(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Internal(context.to_string())
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            RpcError::SessionNotFound => (
                StatusCode::NOT_FOUND,
                CODE_SESSION_NOT_FOUND,
                "Session not found".to_string(),
            ),
            RpcError::AccountNotFound => (
                StatusCode::NOT_FOUND,
                CODE_ACCOUNT_NOT_FOUND,
                "No account for session login".to_string(),
            ),
            RpcError::StoreUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                CODE_STORE_UNAVAILABLE,
                "Session store unavailable".to_string(),
            ),
            RpcError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, CODE_INTERNAL, msg),
        };
        (
            status,
            Json(RpcFailure {
                code: code.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

async fn resolve_user_id(
    State(state): State<IdentityState>,
    Json(query): Json<SessionQuery>,
) -> Result<Json<UserIdReply>, RpcError> {
    let login = match state
        .sessions
        .resolve_login(&query.session_id)
        .await
        .map_err(|e| RpcError::internal("Failed to resolve session", e))?
    {
        Lookup::Found(login) => login,
        Lookup::NotFound => return Err(RpcError::SessionNotFound),
        Lookup::Unavailable => return Err(RpcError::StoreUnavailable),
    };

    let user_id = state
        .db
        .users()
        .get_id_by_login(&login)
        .await
        .map_err(|e| RpcError::internal("Failed to look up account", e))?
        .ok_or_else(|| {
            error!(login = %login, "Active session has no account");
            RpcError::AccountNotFound
        })?;

    debug!(user_id, "Resolved session");
    Ok(Json(UserIdReply { user_id }))
}

async fn check_session(
    State(state): State<IdentityState>,
    Json(query): Json<SessionQuery>,
) -> Result<Json<SessionStatusReply>, RpcError> {
    let status = state
        .sessions
        .session_status(&query.session_id)
        .await
        .map_err(|e| RpcError::internal("Failed to check session", e))?;

    match status {
        Lookup::Found(()) => Ok(Json(SessionStatusReply { active: true })),
        Lookup::NotFound => Ok(Json(SessionStatusReply { active: false })),
        Lookup::Unavailable => Err(RpcError::StoreUnavailable),
    }
}

async fn ids_and_paths(
    State(state): State<IdentityState>,
) -> Result<Json<IdsAndPathsReply>, RpcError> {
    let entries = state
        .db
        .users()
        .ids_and_paths()
        .await
        .map_err(|e| RpcError::internal("Failed to list accounts", e))?;
    Ok(Json(IdsAndPathsReply { entries }))
}
