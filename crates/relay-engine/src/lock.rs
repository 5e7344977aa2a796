//! Execution locking for (account, symbol) keys.
//!
//! Exactly one pipeline may place or cancel orders for a given
//! account+symbol at a time. The default in-process implementation
//! serializes local callers through per-key async mutexes and needs
//! no TTL. Multi-instance deployments plug in a lease-based store
//! (TTL + automatic expiry) through the same trait; acquisition there
//! is bounded and gives up rather than deadlocking.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

use relay_venue::BoxFuture;

use crate::backoff::Backoff;
use crate::config::LeaseConfig;
use crate::error::{EngineError, EngineResult};

/// Lock key for one account+symbol pair.
pub fn lock_key(account_id: &str, symbol: &str) -> String {
    format!("{account_id}:{symbol}")
}

/// Held lock, released on drop on every exit path.
pub struct LockGuard {
    inner: GuardInner,
}

enum GuardInner {
    Local(#[allow(dead_code)] OwnedMutexGuard<()>),
    Lease(Option<LeaseRelease>),
}

struct LeaseRelease {
    store: Arc<dyn LeaseStore>,
    key: String,
    token: String,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let GuardInner::Lease(release) = &mut self.inner {
            if let Some(release) = release.take() {
                // Async release from a sync drop; the TTL covers the
                // case where no runtime is left to run it.
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            if let Err(error) =
                                release.store.release(&release.key, &release.token).await
                            {
                                warn!(key = %release.key, %error, "Lease release failed");
                            }
                        });
                    }
                    Err(_) => {
                        warn!(key = %release.key, "No runtime for lease release, relying on TTL");
                    }
                }
            }
        }
    }
}

/// Serializes execution per key.
pub trait ExecutionLock: Send + Sync {
    /// Acquire exclusive ownership of `key`.
    ///
    /// In-process implementations wait their turn; lease-based ones
    /// retry a bounded number of times and then fail with
    /// `LockUnavailable`.
    fn acquire(&self, key: &str) -> BoxFuture<'_, EngineResult<LockGuard>>;
}

/// Arc wrapper for ExecutionLock trait objects.
pub type DynExecutionLock = Arc<dyn ExecutionLock>;

// ============================================================================
// InProcessLocks
// ============================================================================

/// Per-key async mutexes for single-instance deployments.
///
/// Waiters queue in arrival order (tokio mutex FIFO); keys are never
/// evicted because the key space is bounded by accounts x symbols.
#[derive(Default)]
pub struct InProcessLocks {
    locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl InProcessLocks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExecutionLock for InProcessLocks {
    fn acquire(&self, key: &str) -> BoxFuture<'_, EngineResult<LockGuard>> {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let key = key.to_string();
        Box::pin(async move {
            let guard = mutex.lock_owned().await;
            debug!(%key, "Execution lock acquired (in-process)");
            Ok(LockGuard {
                inner: GuardInner::Local(guard),
            })
        })
    }
}

// ============================================================================
// LeaseStore / LeaseLocks
// ============================================================================

/// Pluggable lease backend for multi-instance deployments.
///
/// A lease expires on its own after the TTL, so a crashed holder
/// cannot block a key forever.
pub trait LeaseStore: Send + Sync {
    /// Try to take the lease. Returns a release token on success,
    /// `None` when another holder owns it.
    fn try_acquire(&self, key: &str, ttl: Duration)
        -> BoxFuture<'_, EngineResult<Option<String>>>;

    /// Release the lease if `token` still owns it.
    fn release(&self, key: &str, token: &str) -> BoxFuture<'_, EngineResult<()>>;
}

/// Lease-backed execution lock with bounded acquisition.
pub struct LeaseLocks {
    store: Arc<dyn LeaseStore>,
    config: LeaseConfig,
}

impl LeaseLocks {
    pub fn new(store: Arc<dyn LeaseStore>, config: LeaseConfig) -> Self {
        Self { store, config }
    }
}

impl ExecutionLock for LeaseLocks {
    fn acquire(&self, key: &str) -> BoxFuture<'_, EngineResult<LockGuard>> {
        let key = key.to_string();
        Box::pin(async move {
            let ttl = Duration::from_millis(self.config.ttl_ms);
            let backoff = Backoff::new(
                self.config.acquire_attempts,
                Duration::from_millis(self.config.acquire_interval_ms),
            );

            let token = backoff
                .run(|attempt| {
                    let key = key.clone();
                    async move {
                        match self.store.try_acquire(&key, ttl).await {
                            Ok(Some(token)) => Some(Ok(token)),
                            Ok(None) => {
                                debug!(%key, attempt, "Lease held elsewhere, retrying");
                                None
                            }
                            Err(error) => Some(Err(error)),
                        }
                    }
                })
                .await;

            match token {
                Some(Ok(token)) => {
                    debug!(%key, "Execution lock acquired (lease)");
                    Ok(LockGuard {
                        inner: GuardInner::Lease(Some(LeaseRelease {
                            store: Arc::clone(&self.store),
                            key,
                            token,
                        })),
                    })
                }
                Some(Err(error)) => Err(error),
                None => Err(EngineError::LockUnavailable {
                    key,
                    attempts: self.config.acquire_attempts,
                }),
            }
        })
    }
}

// ============================================================================
// MemoryLeaseStore
// ============================================================================

/// In-memory lease store for tests and single-node fallback.
#[derive(Default)]
pub struct MemoryLeaseStore {
    leases: DashMap<String, (String, std::time::Instant)>,
    counter: Mutex<u64>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_token(&self) -> String {
        let mut counter = self.counter.lock();
        *counter += 1;
        format!("lease-{}", *counter)
    }
}

impl LeaseStore for MemoryLeaseStore {
    fn try_acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> BoxFuture<'_, EngineResult<Option<String>>> {
        let key = key.to_string();
        Box::pin(async move {
            let now = std::time::Instant::now();
            if let Some(entry) = self.leases.get(&key) {
                if entry.1 > now {
                    return Ok(None);
                }
            }
            let token = self.next_token();
            self.leases.insert(key, (token.clone(), now + ttl));
            Ok(Some(token))
        })
    }

    fn release(&self, key: &str, token: &str) -> BoxFuture<'_, EngineResult<()>> {
        let key = key.to_string();
        let token = token.to_string();
        Box::pin(async move {
            self.leases.remove_if(&key, |_, (held, _)| *held == token);
            Ok(())
        })
    }
}
