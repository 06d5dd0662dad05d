//! Gate rejection types.

use axum::{
    Json,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::cookie::CSRF_HEADER;

/// Why a gate refused the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateErrorKind {
    /// No session cookie, or the session is unknown, expired, or the store is down.
    NotAuthenticated,
    /// The session store answered with an I/O error.
    StoreError,
    DatabaseError,
    /// The identity service could not be reached or failed.
    IdentityUnavailable,
    /// The session is live but its login has no account.
    AccountMissing,
}

/// Authentication rejection (JSON body).
#[derive(Debug)]
pub struct GateError {
    pub(super) kind: GateErrorKind,
}

impl GateError {
    pub(super) fn new(kind: GateErrorKind) -> Self {
        Self { kind }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            GateErrorKind::NotAuthenticated => StatusCode::UNAUTHORIZED,
            GateErrorKind::StoreError
            | GateErrorKind::DatabaseError
            | GateErrorKind::AccountMissing => StatusCode::INTERNAL_SERVER_ERROR,
            GateErrorKind::IdentityUnavailable => StatusCode::BAD_GATEWAY,
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            GateErrorKind::NotAuthenticated => "Not authenticated",
            GateErrorKind::StoreError => "Session store error",
            GateErrorKind::DatabaseError => "Database error",
            GateErrorKind::IdentityUnavailable => "Identity service unavailable",
            GateErrorKind::AccountMissing => "Account missing for session",
        }
    }
}

impl From<GateErrorKind> for GateError {
    fn from(kind: GateErrorKind) -> Self {
        Self::new(kind)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}

/// CSRF rejection. Carries a replacement token for the client to retry with,
/// or `None` when none could be minted (sent as `null`).
#[derive(Debug)]
pub struct CsrfRejection {
    pub replacement: Option<String>,
}

impl IntoResponse for CsrfRejection {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::PRECONDITION_FAILED,
            Json(ErrorResponse {
                error: "Invalid CSRF token",
            }),
        )
            .into_response();
        response
            .headers_mut()
            .insert(CSRF_HEADER, csrf_header_value(self.replacement.as_deref()));
        response
    }
}

/// Header value for a CSRF token, `null` when there is none.
pub fn csrf_header_value(token: Option<&str>) -> HeaderValue {
    token
        .and_then(|t| HeaderValue::from_str(t).ok())
        .unwrap_or_else(|| HeaderValue::from_static("null"))
}
