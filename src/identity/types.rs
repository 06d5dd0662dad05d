//! Wire types shared by the identity server and client.

use serde::{Deserialize, Serialize};

use crate::db::IdAndPath;

pub const RESOLVE_USER_ID_PATH: &str = "/identity/v1/resolve-user-id";
pub const CHECK_SESSION_PATH: &str = "/identity/v1/check-session";
pub const IDS_AND_PATHS_PATH: &str = "/identity/v1/ids-and-paths";

pub const CODE_SESSION_NOT_FOUND: &str = "session_not_found";
pub const CODE_ACCOUNT_NOT_FOUND: &str = "account_not_found";
pub const CODE_STORE_UNAVAILABLE: &str = "store_unavailable";
pub const CODE_INTERNAL: &str = "internal";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdReply {
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusReply {
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdsAndPathsReply {
    pub entries: Vec<IdAndPath>,
}

/// Body of every non-2xx identity response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcFailure {
    pub code: String,
    pub message: String,
}
