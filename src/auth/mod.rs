//! Request gate.
//!
//! The session token travels in the `session_id` cookie, the CSRF token in the
//! `x-csrf-token` header. The account service resolves sessions locally
//! ([`SessionAuth`]); every other service asks the identity service
//! ([`PeerAuth`]). State-changing routes additionally take [`CsrfProtected`].

mod cookie;
mod errors;
mod extractors;
mod state;
mod types;

pub use cookie::{
    CSRF_HEADER, SESSION_COOKIE_NAME, clear_session_cookie, csrf_token, get_cookie,
    session_cookie, session_token,
};
pub use errors::{CsrfRejection, GateError, GateErrorKind, csrf_header_value};
pub use extractors::{
    CsrfProtected, PeerAuth, SessionAuth, require_peer_session, require_session,
};
pub use state::{HasCsrf, HasIdentityClient, HasSessions};
pub use types::{AuthenticatedLogin, AuthenticatedUserId};
