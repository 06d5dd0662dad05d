//! Identities attached to a request by the gates.

use serde::Serialize;

use crate::db::UserRole;

/// Caller identity resolved by the local gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedLogin {
    pub login: String,
    pub role: UserRole,
}

/// Caller identity resolved by the remote gate through the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AuthenticatedUserId(pub i64);
