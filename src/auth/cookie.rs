//! Cookie and header helpers for session and CSRF identity.

use axum::http::{HeaderMap, header};

use crate::authority::SESSION_TTL;

/// Cookie carrying the session token.
pub const SESSION_COOKIE_NAME: &str = "session_id";

/// Request and response header carrying the CSRF token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Session token from the request, if a non-empty one was sent.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    get_cookie(headers, SESSION_COOKIE_NAME).filter(|v| !v.is_empty())
}

/// CSRF token from the request header, if a non-empty one was sent.
pub fn csrf_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(CSRF_HEADER)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value establishing a session.
pub fn session_cookie(token: &str, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
        SESSION_COOKIE_NAME,
        token,
        SESSION_TTL.as_secs(),
        secure
    )
}

/// `Set-Cookie` value expiring the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0{}",
        SESSION_COOKIE_NAME, secure
    )
}
