//! State traits the gates are generic over, and macros to implement them.

use crate::authority::{CsrfAuthority, SessionAuthority};
use crate::db::Database;
use crate::identity::IdentityClient;

/// State for the local gate: the session authority plus the account database.
pub trait HasSessions {
    fn sessions(&self) -> &SessionAuthority;
    fn db(&self) -> &Database;
}

/// State for the CSRF gate.
pub trait HasCsrf {
    fn csrf(&self) -> &CsrfAuthority;
}

/// State for the remote gate used by services that do not own accounts.
pub trait HasIdentityClient {
    fn identity(&self) -> &IdentityClient;
}

/// Implement `HasSessions` for a state struct with `sessions: Arc<SessionAuthority>`
/// and `db: Database` fields.
///
/// # Example
/// ```ignore
/// #[derive(Clone)]
/// pub struct MyState {
///     pub sessions: Arc<SessionAuthority>,
///     pub db: Database,
/// }
///
/// impl_has_sessions!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_sessions {
    ($state_type:ty) => {
        impl $crate::auth::HasSessions for $state_type {
            fn sessions(&self) -> &$crate::authority::SessionAuthority {
                &self.sessions
            }
            fn db(&self) -> &$crate::db::Database {
                &self.db
            }
        }
    };
}

/// Implement `HasCsrf` for a state struct with a `csrf: Arc<CsrfAuthority>` field.
#[macro_export]
macro_rules! impl_has_csrf {
    ($state_type:ty) => {
        impl $crate::auth::HasCsrf for $state_type {
            fn csrf(&self) -> &$crate::authority::CsrfAuthority {
                &self.csrf
            }
        }
    };
}

/// Implement `HasIdentityClient` for a state struct with an
/// `identity: IdentityClient` field.
#[macro_export]
macro_rules! impl_has_identity_client {
    ($state_type:ty) => {
        impl $crate::auth::HasIdentityClient for $state_type {
            fn identity(&self) -> &$crate::identity::IdentityClient {
                &self.identity
            }
        }
    };
}
