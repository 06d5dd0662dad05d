use std::time::Duration;

use tokio::sync::RwLock;
use tracing::warn;

use super::generate_token_id;
use crate::store::{StoreError, TokenStore};

/// CSRF token lifetime: 3 hours.
pub const CSRF_TTL: Duration = Duration::from_secs(3 * 60 * 60);

/// Issues and validates anti-forgery tokens.
///
/// Tokens are self-referential (stored value equals the key) and may be
/// presented any number of times within their TTL.
pub struct CsrfAuthority {
    store: TokenStore,
    in_flight: RwLock<()>,
}

impl CsrfAuthority {
    pub fn new(store: TokenStore) -> Self {
        Self {
            store,
            in_flight: RwLock::new(()),
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Mint a new token. `Ok(None)` if the store is marked down.
    pub async fn create_token(&self) -> Result<Option<String>, StoreError> {
        let id = generate_token_id();

        let _guard = self.in_flight.write().await;
        if !self.store.put(&id, &id, CSRF_TTL).await? {
            warn!("CSRF token not created, store unavailable");
            return Ok(None);
        }
        Ok(Some(id))
    }

    /// Whether `id` is a live token. Empty ids and a down store read as invalid.
    pub async fn check_token(&self, id: &str) -> Result<bool, StoreError> {
        if id.is_empty() {
            return Ok(false);
        }
        let _guard = self.in_flight.read().await;
        Ok(self.store.exists(id).await?.is_found())
    }

    /// Get-or-create: hand back `presented` if it is still valid, otherwise
    /// mint a fresh token. `Ok(None)` if no token could be minted.
    pub async fn issue(&self, presented: Option<&str>) -> Result<Option<String>, StoreError> {
        if let Some(token) = presented.filter(|t| !t.is_empty()) {
            if self.check_token(token).await? {
                return Ok(Some(token.to_string()));
            }
        }
        self.create_token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Lookup;

    fn authority() -> (CsrfAuthority, std::sync::Arc<crate::store::MemoryBackend>) {
        let (store, backend) = TokenStore::in_memory("csrf");
        (CsrfAuthority::new(store), backend)
    }

    #[tokio::test]
    async fn test_token_is_self_referential() {
        let (csrf, _) = authority();
        let token = csrf.create_token().await.unwrap().unwrap();

        assert_eq!(
            csrf.store().get(&token).await.unwrap(),
            Lookup::Found(token.clone())
        );
        assert!(csrf.check_token(&token).await.unwrap());
    }

    #[tokio::test]
    async fn test_issue_reuses_valid_token() {
        let (csrf, _) = authority();
        let first = csrf.issue(None).await.unwrap().unwrap();
        let second = csrf.issue(Some(&first)).await.unwrap().unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_issue_replaces_unknown_token() {
        let (csrf, _) = authority();
        let token = csrf.issue(Some("nosuchtoken")).await.unwrap().unwrap();

        assert_ne!(token, "nosuchtoken");
        assert!(csrf.check_token(&token).await.unwrap());
    }

    #[tokio::test]
    async fn test_issue_replaces_expired_token() {
        let (csrf, _) = authority();
        let expired = "expiredcsrftokenexpiredcsrftoken";
        assert!(
            csrf.store()
                .put(expired, expired, Duration::from_millis(10))
                .await
                .unwrap()
        );
        tokio::time::sleep(Duration::from_millis(30)).await;

        let token = csrf.issue(Some(expired)).await.unwrap().unwrap();
        assert_ne!(token, expired);
        assert!(csrf.check_token(&token).await.unwrap());
        assert!(!csrf.check_token(expired).await.unwrap());
    }

    #[tokio::test]
    async fn test_issue_ignores_empty_header() {
        let (csrf, _) = authority();
        let token = csrf.issue(Some("")).await.unwrap().unwrap();
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn test_store_down() {
        let (csrf, backend) = authority();
        let token = csrf.create_token().await.unwrap().unwrap();

        backend.set_reachable(false);
        csrf.store().probe().await;

        assert!(!csrf.check_token(&token).await.unwrap());
        assert_eq!(csrf.issue(Some(&token)).await.unwrap(), None);
        assert_eq!(csrf.create_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_token_rejected() {
        let (csrf, _) = authority();
        assert!(!csrf.check_token("").await.unwrap());
    }
}
