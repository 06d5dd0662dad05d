//! Store liveness tracking.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{error, info};

use super::backend::KvBackend;

/// Interval between liveness probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(15);

/// Process-wide "is the store up" flag, shared by every clone.
///
/// Read on every token operation; written only by the liveness probe.
#[derive(Clone, Debug)]
pub struct StoreHealth {
    up: Arc<AtomicBool>,
}

impl StoreHealth {
    /// Stores start out healthy: construction already verified the connection.
    pub fn new() -> Self {
        Self {
            up: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    /// Returns the previous value.
    fn set(&self, up: bool) -> bool {
        self.up.swap(up, Ordering::AcqRel)
    }
}

impl Default for StoreHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Ping the store once and record the result.
/// Transitions are logged; steady state is silent.
pub async fn probe_once(
    backend: &dyn KvBackend,
    health: &StoreHealth,
    namespace: &str,
    timeout: Duration,
) -> bool {
    let result = match tokio::time::timeout(timeout, backend.ping()).await {
        Ok(result) => result,
        Err(_) => Err(super::StoreError::Timeout { operation: "ping" }),
    };

    let up = result.is_ok();
    let was_up = health.set(up);

    match (was_up, result) {
        (true, Err(e)) => error!(namespace, error = %e, "Token store unreachable"),
        (false, Ok(())) => info!(namespace, "Token store reachable again"),
        _ => {}
    }

    up
}

/// Spawn the background liveness probe for one store.
/// The first ping happens one interval after startup.
pub fn spawn_health_probe(
    backend: Arc<dyn KvBackend>,
    health: StoreHealth,
    namespace: &'static str,
    interval: Duration,
    timeout: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            probe_once(backend.as_ref(), &health, namespace, timeout).await;
        }
    })
}
