//! Cached account state.
//!
//! The account-state collaborator (user-data stream, fill feed)
//! pushes best-effort snapshots here; the open path reads them to
//! skip a balance round trip when the cache is fresh. Anything
//! missing, stale, or zero falls back to a live venue query, so a
//! cold or lagging store only costs latency, never correctness.

use std::sync::Arc;

use dashmap::DashMap;

use relay_core::AccountSnapshot;

/// Source of last-known account snapshots.
pub trait SnapshotProvider: Send + Sync {
    /// The most recent snapshot for an account, if any.
    fn last_snapshot(&self, account_id: &str) -> Option<AccountSnapshot>;
}

/// Shared handle to a snapshot source.
pub type DynSnapshotProvider = Arc<dyn SnapshotProvider>;

/// In-memory snapshot store keyed by account.
///
/// Writers overwrite; there is no history. An empty store answers
/// `None` for everything, which keeps executors built without a feed
/// on the live-query path.
#[derive(Default)]
pub struct SnapshotStore {
    snapshots: DashMap<String, AccountSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest snapshot for an account.
    pub fn record(&self, account_id: &str, snapshot: AccountSnapshot) {
        self.snapshots.insert(account_id.to_string(), snapshot);
    }
}

impl SnapshotProvider for SnapshotStore {
    fn last_snapshot(&self, account_id: &str) -> Option<AccountSnapshot> {
        self.snapshots.get(account_id).map(|entry| entry.clone())
    }
}
