//! CSRF token endpoint.
//!
//! GET `/csrf` returns a token in the `X-CSRF-Token` header: the one the
//! client sent if it is still valid, otherwise a fresh one.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::error;

use crate::auth::{CSRF_HEADER, csrf_header_value, csrf_token};
use crate::authority::CsrfAuthority;

#[derive(Clone)]
pub struct CsrfState {
    pub csrf: Arc<CsrfAuthority>,
}

pub fn router(state: CsrfState) -> Router {
    Router::new()
        .route("/csrf", get(get_csrf_token))
        .with_state(state)
}

async fn get_csrf_token(State(state): State<CsrfState>, headers: HeaderMap) -> Response {
    let (status, token) = match state.csrf.issue(csrf_token(&headers)).await {
        Ok(Some(token)) => (StatusCode::OK, Some(token)),
        Ok(None) => (StatusCode::SERVICE_UNAVAILABLE, None),
        Err(e) => {
            error!(error = %e, "Failed to issue CSRF token");
            (StatusCode::INTERNAL_SERVER_ERROR, None)
        }
    };
    (status, [(CSRF_HEADER, csrf_header_value(token.as_deref()))]).into_response()
}
