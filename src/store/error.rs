use std::fmt;

/// Failure of a single key-value store call.
///
/// A store that is marked down never produces one of these: the adapter
/// short-circuits to [`super::Lookup::Unavailable`] or `Ok(false)` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store answered with an error or the connection broke mid-call.
    Backend(String),
    /// The call did not complete within the configured operation timeout.
    Timeout { operation: &'static str },
    /// The store location could not be parsed at startup.
    InvalidUrl(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Backend(msg) => write!(f, "token store error: {msg}"),
            StoreError::Timeout { operation } => write!(f, "token store {operation} timed out"),
            StoreError::InvalidUrl(msg) => write!(f, "invalid token store url: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Backend(e.to_string())
    }
}
