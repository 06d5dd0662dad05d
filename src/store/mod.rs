//! Token store adapter.
//!
//! Wraps a key-value backend with a liveness flag so that request handlers
//! never wait on a store that is already known to be down. While the flag
//! is down, reads report [`Lookup::Unavailable`] and writes report
//! `Ok(false)`; neither is an error. Errors are reserved for calls that were
//! attempted and failed.

mod backend;
mod error;
mod health;
mod memory;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

pub use backend::{KvBackend, RedisBackend};
pub use error::StoreError;
pub use health::{DEFAULT_PROBE_INTERVAL, StoreHealth, probe_once, spawn_health_probe};
pub use memory::MemoryBackend;

/// Default bound on a single store call.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(2);

/// URL scheme selecting the in-process backend.
pub const MEMORY_URL: &str = "memory://";

/// Outcome of a read against the token store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    /// The store answered and the key is absent (expired or never written).
    NotFound,
    /// The store is marked down; nothing was attempted.
    Unavailable,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// Health-aware handle on one token namespace (one logical database).
///
/// Cheap to clone; clones share the backend connection and health flag.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KvBackend>,
    health: StoreHealth,
    namespace: &'static str,
    op_timeout: Duration,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KvBackend>, namespace: &'static str, op_timeout: Duration) -> Self {
        Self {
            backend,
            health: StoreHealth::new(),
            namespace,
            op_timeout,
        }
    }

    /// Store over a fresh in-memory backend.
    pub fn in_memory(namespace: &'static str) -> (Self, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = Self::new(backend.clone(), namespace, DEFAULT_OP_TIMEOUT);
        (store, backend)
    }

    /// Connect to the store at `url`. `memory://` selects the in-process
    /// backend; anything else is handed to the Redis client.
    pub async fn connect(
        url: &str,
        namespace: &'static str,
        op_timeout: Duration,
    ) -> Result<Self, StoreError> {
        if url == MEMORY_URL {
            return Ok(Self::new(Arc::new(MemoryBackend::new()), namespace, op_timeout));
        }

        let backend = tokio::time::timeout(op_timeout, RedisBackend::connect(url))
            .await
            .map_err(|_| StoreError::Timeout {
                operation: "connect",
            })??;
        Ok(Self::new(Arc::new(backend), namespace, op_timeout))
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn health(&self) -> &StoreHealth {
        &self.health
    }

    /// Run a single liveness probe now.
    pub async fn probe(&self) -> bool {
        probe_once(
            self.backend.as_ref(),
            &self.health,
            self.namespace,
            self.op_timeout,
        )
        .await
    }

    /// Start the background liveness probe for this store.
    pub fn spawn_probe(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        spawn_health_probe(
            self.backend.clone(),
            self.health.clone(),
            self.namespace,
            interval,
            self.op_timeout,
        )
    }

    /// Write `id -> value` with a TTL. `Ok(false)` means the store is marked
    /// down and nothing was written.
    pub async fn put(&self, id: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        if !self.is_up("put") {
            return Ok(false);
        }
        self.bounded("put", self.backend.set_with_ttl(id, value, ttl))
            .await?;
        Ok(true)
    }

    pub async fn exists(&self, id: &str) -> Result<Lookup<()>, StoreError> {
        if !self.is_up("exists") {
            return Ok(Lookup::Unavailable);
        }
        let found = self.bounded("exists", self.backend.exists(id)).await?;
        Ok(if found { Lookup::Found(()) } else { Lookup::NotFound })
    }

    pub async fn get(&self, id: &str) -> Result<Lookup<String>, StoreError> {
        if !self.is_up("get") {
            return Ok(Lookup::Unavailable);
        }
        let value = self.bounded("get", self.backend.get(id)).await?;
        Ok(value.map_or(Lookup::NotFound, Lookup::Found))
    }

    /// Idempotent. `Ok(false)` means the store is marked down and the delete
    /// was not issued.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        if !self.is_up("delete") {
            return Ok(false);
        }
        self.bounded("delete", self.backend.delete(id)).await?;
        Ok(true)
    }

    fn is_up(&self, operation: &'static str) -> bool {
        let up = self.health.is_up();
        if !up {
            warn!(namespace = self.namespace, operation, "Token store marked down, skipping");
        }
        up
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let result = match tokio::time::timeout(self.op_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout { operation }),
        };
        if let Err(ref e) = result {
            error!(namespace = self.namespace, operation, error = %e, "Token store call failed");
        }
        result
    }
}
