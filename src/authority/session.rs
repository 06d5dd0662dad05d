use std::time::{Duration, SystemTime};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::generate_token_id;
use crate::store::{Lookup, StoreError, TokenStore};

/// Session lifetime: 24 hours.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A freshly established session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub login: String,
    pub expires_at: SystemTime,
}

/// Issues and resolves session tokens bound to a user login.
///
/// The lock only orders operations issued by this process; the store is the
/// real arbiter across service instances.
pub struct SessionAuthority {
    store: TokenStore,
    in_flight: RwLock<()>,
}

impl SessionAuthority {
    pub fn new(store: TokenStore) -> Self {
        Self {
            store,
            in_flight: RwLock::new(()),
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Create a session for `login`.
    ///
    /// Returns `Ok(None)` if the store is marked down: no session could be
    /// established, but nothing failed either.
    pub async fn create_session(&self, login: &str) -> Result<Option<Session>, StoreError> {
        let id = generate_token_id();
        let expires_at = SystemTime::now() + SESSION_TTL;

        let _guard = self.in_flight.write().await;
        if !self.store.put(&id, login, SESSION_TTL).await? {
            warn!(login, "Session not created, store unavailable");
            return Ok(None);
        }

        debug!(login, "Session created");
        Ok(Some(Session {
            id,
            login: login.to_string(),
            expires_at,
        }))
    }

    /// Existence check that keeps "store down" distinct from "no such session".
    pub async fn session_status(&self, id: &str) -> Result<Lookup<()>, StoreError> {
        if id.is_empty() {
            return Ok(Lookup::NotFound);
        }
        let _guard = self.in_flight.read().await;
        self.store.exists(id).await
    }

    /// Whether the session exists. Fails closed: a down store reads as inactive.
    pub async fn is_active(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.session_status(id).await?.is_found())
    }

    /// Map a session id to the login it was created for.
    pub async fn resolve_login(&self, id: &str) -> Result<Lookup<String>, StoreError> {
        if id.is_empty() {
            return Ok(Lookup::NotFound);
        }
        let _guard = self.in_flight.read().await;
        self.store.get(id).await
    }

    /// Delete the session. Idempotent; `Ok(false)` means the store was marked
    /// down and the delete was not issued.
    pub async fn kill(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.in_flight.write().await;
        let deleted = self.store.delete(id).await?;
        if !deleted {
            warn!("Session not killed, store unavailable");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::TOKEN_LEN;
    use std::sync::Arc;

    fn authority() -> (SessionAuthority, Arc<crate::store::MemoryBackend>) {
        let (store, backend) = TokenStore::in_memory("session");
        (SessionAuthority::new(store), backend)
    }

    #[tokio::test]
    async fn test_create_then_resolve() {
        let (sessions, _) = authority();

        let session = sessions.create_session("alice").await.unwrap().unwrap();
        assert_eq!(session.id.len(), TOKEN_LEN);
        assert_eq!(session.login, "alice");
        assert!(session.expires_at > SystemTime::now() + SESSION_TTL - Duration::from_secs(60));

        assert!(sessions.is_active(&session.id).await.unwrap());
        assert_eq!(
            sessions.resolve_login(&session.id).await.unwrap(),
            Lookup::Found("alice".to_string())
        );
    }

    #[tokio::test]
    async fn test_kill_is_terminal() {
        let (sessions, _) = authority();
        let session = sessions.create_session("alice").await.unwrap().unwrap();

        assert!(sessions.kill(&session.id).await.unwrap());
        assert!(!sessions.is_active(&session.id).await.unwrap());
        assert_eq!(
            sessions.resolve_login(&session.id).await.unwrap(),
            Lookup::NotFound
        );
    }

    #[tokio::test]
    async fn test_kill_twice() {
        let (sessions, _) = authority();
        let session = sessions.create_session("alice").await.unwrap().unwrap();

        assert!(sessions.kill(&session.id).await.is_ok());
        assert!(sessions.kill(&session.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_fail_closed_when_store_down() {
        let (sessions, backend) = authority();
        let session = sessions.create_session("alice").await.unwrap().unwrap();

        backend.set_reachable(false);
        sessions.store().probe().await;

        assert!(sessions.create_session("bob").await.unwrap().is_none());
        assert!(!sessions.is_active(&session.id).await.unwrap());
        assert_eq!(
            sessions.resolve_login(&session.id).await.unwrap(),
            Lookup::Unavailable
        );
        assert_eq!(
            sessions.session_status(&session.id).await.unwrap(),
            Lookup::Unavailable
        );
    }

    #[tokio::test]
    async fn test_empty_id_never_active() {
        let (sessions, _) = authority();
        assert!(!sessions.is_active("").await.unwrap());
        assert_eq!(sessions.resolve_login("").await.unwrap(), Lookup::NotFound);
    }

    #[tokio::test]
    async fn test_distinct_sessions_per_login_event() {
        let (sessions, _) = authority();
        let first = sessions.create_session("alice").await.unwrap().unwrap();
        let second = sessions.create_session("alice").await.unwrap().unwrap();

        assert_ne!(first.id, second.id);
        sessions.kill(&first.id).await.unwrap();
        assert!(sessions.is_active(&second.id).await.unwrap());
    }
}
