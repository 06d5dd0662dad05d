//! Axum extractors and middleware enforcing authentication.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};

use super::cookie::{csrf_token, session_token};
use super::errors::{CsrfRejection, GateError, GateErrorKind};
use super::state::{HasCsrf, HasIdentityClient, HasSessions};
use super::types::{AuthenticatedLogin, AuthenticatedUserId};
use crate::identity::IdentityError;
use crate::store::Lookup;

/// Resolve the session cookie against the local session authority.
async fn authenticate_local<S>(parts: &Parts, state: &S) -> Result<AuthenticatedLogin, GateErrorKind>
where
    S: HasSessions + Send + Sync,
{
    let token = session_token(&parts.headers).ok_or(GateErrorKind::NotAuthenticated)?;

    let login = match state.sessions().resolve_login(token).await {
        Ok(Lookup::Found(login)) => login,
        Ok(Lookup::NotFound) | Ok(Lookup::Unavailable) => {
            return Err(GateErrorKind::NotAuthenticated);
        }
        Err(e) => {
            error!(error = %e, "Failed to resolve session");
            return Err(GateErrorKind::StoreError);
        }
    };

    let role = state
        .db()
        .users()
        .get_role(&login)
        .await
        .map_err(|e| {
            error!(login = %login, error = %e, "Failed to get user role");
            GateErrorKind::DatabaseError
        })?
        .ok_or_else(|| {
            error!(login = %login, "Active session has no account");
            GateErrorKind::AccountMissing
        })?;

    Ok(AuthenticatedLogin { login, role })
}

/// Resolve the session cookie through the identity service.
async fn authenticate_remote<S>(parts: &Parts, state: &S) -> Result<AuthenticatedUserId, GateErrorKind>
where
    S: HasIdentityClient + Send + Sync,
{
    let token = session_token(&parts.headers).ok_or(GateErrorKind::NotAuthenticated)?;

    match state.identity().resolve_user_id(token).await {
        Ok(Some(id)) => Ok(AuthenticatedUserId(id)),
        Ok(None) => Err(GateErrorKind::NotAuthenticated),
        Err(IdentityError::AccountMissing) => Err(GateErrorKind::AccountMissing),
        Err(e) => {
            warn!(error = %e, "Identity lookup failed");
            Err(GateErrorKind::IdentityUnavailable)
        }
    }
}

/// Local gate for the account-owning service.
/// Requires an active session and yields the login and role.
pub struct SessionAuth(pub AuthenticatedLogin);

impl<S> FromRequestParts<S> for SessionAuth
where
    S: HasSessions + Send + Sync,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticate_local(parts, state).await?;
        parts.extensions.insert(user.clone());
        Ok(SessionAuth(user))
    }
}

/// Remote gate for services that do not own accounts.
/// A clean "not logged in" answer is a 401; an identity service failure is a 502.
pub struct PeerAuth(pub AuthenticatedUserId);

impl<S> FromRequestParts<S> for PeerAuth
where
    S: HasIdentityClient + Send + Sync,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticate_remote(parts, state).await?;
        parts.extensions.insert(user);
        Ok(PeerAuth(user))
    }
}

/// CSRF gate for state-changing requests. Holds the validated token.
pub struct CsrfProtected(pub String);

impl<S> FromRequestParts<S> for CsrfProtected
where
    S: HasCsrf + Send + Sync,
{
    type Rejection = CsrfRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(token) = csrf_token(&parts.headers) {
            match state.csrf().check_token(token).await {
                Ok(true) => return Ok(CsrfProtected(token.to_string())),
                Ok(false) => debug!("Rejected unknown CSRF token"),
                Err(e) => error!(error = %e, "Failed to check CSRF token"),
            }
        }

        let replacement = match state.csrf().create_token().await {
            Ok(token) => token,
            Err(e) => {
                error!(error = %e, "Failed to mint replacement CSRF token");
                None
            }
        };
        Err(CsrfRejection { replacement })
    }
}

/// Middleware form of [`SessionAuth`], for guarding a whole router.
pub async fn require_session<S>(
    State(state): State<S>,
    request: Request,
    next: Next,
) -> Result<Response, GateError>
where
    S: HasSessions + Clone + Send + Sync,
{
    let (mut parts, body) = request.into_parts();
    SessionAuth::from_request_parts(&mut parts, &state).await?;
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Middleware form of [`PeerAuth`], for guarding a whole router.
pub async fn require_peer_session<S>(
    State(state): State<S>,
    request: Request,
    next: Next,
) -> Result<Response, GateError>
where
    S: HasIdentityClient + Clone + Send + Sync,
{
    let (mut parts, body) = request.into_parts();
    PeerAuth::from_request_parts(&mut parts, &state).await?;
    Ok(next.run(Request::from_parts(parts, body)).await)
}
