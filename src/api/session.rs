//! Sign-in, sign-up and session endpoints.
//!
//! - POST `/signin` - Check credentials and start a session
//! - POST `/signup` - Register an account
//! - POST `/logout` - End the current session and expire the cookie
//! - GET `/authcheck` - Login and role of the current session

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ApiError, ResultExt, validate_email};
use crate::auth::{
    AuthenticatedLogin, CsrfProtected, SessionAuth, clear_session_cookie, session_cookie,
    session_token,
};
use crate::authority::{CsrfAuthority, SessionAuthority};
use crate::db::{AccountError, Database, NewUser, UserRole};
use crate::{impl_has_csrf, impl_has_sessions};

#[derive(Clone)]
pub struct SessionState {
    pub db: Database,
    pub sessions: Arc<SessionAuthority>,
    pub csrf: Arc<CsrfAuthority>,
    pub secure_cookies: bool,
}

impl_has_sessions!(SessionState);
impl_has_csrf!(SessionState);

pub fn router(state: SessionState) -> Router {
    Router::new()
        .route("/signin", post(signin))
        .route("/signup", post(signup))
        .route("/logout", post(logout))
        .route("/authcheck", get(authcheck))
        .with_state(state)
}

#[derive(Deserialize)]
struct SigninRequest {
    login: String,
    password: String,
}

#[derive(Serialize)]
struct SigninResponse {
    login: String,
    role: UserRole,
}

async fn signin(
    State(state): State<SessionState>,
    _csrf: CsrfProtected,
    Json(payload): Json<SigninRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .verify_credentials(&payload.login, &payload.password)
        .await
        .db_err("Failed to check credentials")?
        .ok_or_else(|| ApiError::unauthorized("Invalid login or password"))?;

    let session = state
        .sessions
        .create_session(&user.login)
        .await
        .store_err("Failed to create session")?
        .ok_or_else(|| ApiError::unavailable("Could not establish session"))?;

    info!(login = %user.login, "Signed in");

    Ok((
        [(SET_COOKIE, session_cookie(&session.id, state.secure_cookies))],
        Json(SigninResponse {
            login: user.login,
            role: user.role,
        }),
    ))
}

#[derive(Deserialize)]
struct SignupRequest {
    login: String,
    password: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    birth_date: String,
    email: String,
}

async fn signup(
    State(state): State<SessionState>,
    _csrf: CsrfProtected,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let login = payload.login.trim();
    if login.is_empty() {
        return Err(ApiError::bad_request("Login cannot be empty"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::bad_request("Password cannot be empty"));
    }
    validate_email(&payload.email)?;

    let users = state.db.users();
    if users.exists(login).await.db_err("Failed to check login")? {
        return Err(ApiError::conflict("Login already taken"));
    }

    let new_user = NewUser {
        login,
        password: &payload.password,
        name: &payload.name,
        birth_date: &payload.birth_date,
        email: &payload.email,
    };
    match users.create(&new_user).await {
        Ok(id) => {
            info!(login = %login, user_id = id, "Account created");
            Ok(StatusCode::CREATED)
        }
        // Lost a race with a concurrent signup for the same login.
        Err(AccountError::Database(e))
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation()) =>
        {
            Err(ApiError::conflict("Login already taken"))
        }
        Err(e) => Err(ApiError::db_error("Failed to create account", e)),
    }
}

async fn logout(
    State(state): State<SessionState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = session_token(&headers).ok_or_else(|| ApiError::unauthorized("No session"))?;

    let active = state
        .sessions
        .is_active(token)
        .await
        .store_err("Failed to check session")?;
    if !active {
        return Err(ApiError::unauthorized("No active session"));
    }

    let killed = state
        .sessions
        .kill(token)
        .await
        .store_err("Failed to kill session")?;
    if !killed {
        return Err(ApiError::unavailable("Could not end session"));
    }

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, clear_session_cookie(state.secure_cookies))],
    ))
}

async fn authcheck(SessionAuth(user): SessionAuth) -> Json<AuthenticatedLogin> {
    Json(user)
}
