//! Signal execution engine.
//!
//! Turns authenticated trading signals into venue orders across many
//! accounts: intent derivation, duplicate suppression, per-key
//! execution locking, position-flip reconciliation, risk sizing,
//! venue-rule normalization, and error-aware placement, fanned out
//! under a bounded worker pool.

pub mod backoff;
pub mod config;
pub mod dedupe;
pub mod dispatch;
pub mod error;
pub mod intent;
pub mod lock;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod retry;
pub mod sizing;
pub mod snapshot;

pub use backoff::Backoff;
pub use config::{EngineConfig, FlipConfig, LeaseConfig, RetryConfig, SizerConfig};
pub use dedupe::DedupeWindow;
pub use dispatch::{AccountHandle, Dispatcher};
pub use error::{EngineError, EngineResult};
pub use intent::{derive_intent, Derived, NoopReason};
pub use lock::{
    lock_key, DynExecutionLock, ExecutionLock, InProcessLocks, LeaseLocks, LeaseStore, LockGuard,
    MemoryLeaseStore,
};
pub use normalize::{normalize_order, NormalizeReject};
pub use pipeline::AccountExecutor;
pub use reconcile::{FlipOutcome, FlipReconciler};
pub use retry::{PlaceOutcome, RetryPolicy};
pub use sizing::{RiskSizer, SizingReject};
pub use snapshot::{DynSnapshotProvider, SnapshotProvider, SnapshotStore};
