//! Idempotency window for repeated signal deliveries.
//!
//! Upstream transport already deduplicates at the message level; this
//! window catches rapid redeliveries of the same logical signal to
//! the same account (webhook retries, double-publish) inside a short
//! time bucket. Entries are keyed on every discriminating signal
//! field so two genuinely different signals never collide.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use relay_core::{PositionSide, Signal, SignalAction};

/// Idempotency key for one (account, signal, bucket) combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupeKey {
    account_id: String,
    signal_id: String,
    action: SignalAction,
    target: PositionSide,
    previous: PositionSide,
    bucket: i64,
}

/// Short-lived duplicate-suppression window.
pub struct DedupeWindow {
    seen: DashMap<DedupeKey, i64>,
    bucket_secs: i64,
}

impl DedupeWindow {
    /// Create a window with the given bucket length in seconds.
    pub fn new(bucket_secs: u64) -> Self {
        Self {
            seen: DashMap::new(),
            bucket_secs: bucket_secs.max(1) as i64,
        }
    }

    /// Claim a (account, signal) pair for the current bucket.
    ///
    /// Returns `false` when the same signal was already claimed in
    /// this bucket; the caller must skip execution.
    pub fn try_claim(&self, account_id: &str, signal: &Signal, now: DateTime<Utc>) -> bool {
        let bucket = now.timestamp() / self.bucket_secs;
        let key = DedupeKey {
            account_id: account_id.to_string(),
            signal_id: signal.id.clone(),
            action: signal.action,
            target: signal.target_position,
            previous: signal.previous_position,
            bucket,
        };

        let fresh = self.seen.insert(key, bucket).is_none();
        if !fresh {
            debug!(
                account = %account_id,
                signal = %signal.id,
                "Duplicate signal within idempotency window, skipping"
            );
        }

        // Opportunistic sweep: entries older than the previous bucket
        // can never match again.
        self.seen.retain(|_, b| bucket - *b <= 1);

        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn signal() -> Signal {
        Signal {
            id: "open_long".to_string(),
            action: SignalAction::Buy,
            target_position: PositionSide::Long,
            previous_position: PositionSide::Flat,
        }
    }

    #[test]
    fn test_first_claim_succeeds() {
        let window = DedupeWindow::new(5);
        assert!(window.try_claim("acct-1", &signal(), Utc::now()));
    }

    #[test]
    fn test_duplicate_in_same_bucket_rejected() {
        let window = DedupeWindow::new(60);
        let now = Utc::now();
        assert!(window.try_claim("acct-1", &signal(), now));
        assert!(!window.try_claim("acct-1", &signal(), now));
    }

    #[test]
    fn test_different_accounts_do_not_collide() {
        let window = DedupeWindow::new(60);
        let now = Utc::now();
        assert!(window.try_claim("acct-1", &signal(), now));
        assert!(window.try_claim("acct-2", &signal(), now));
    }

    #[test]
    fn test_different_signal_fields_do_not_collide() {
        let window = DedupeWindow::new(60);
        let now = Utc::now();
        assert!(window.try_claim("acct-1", &signal(), now));

        let mut other = signal();
        other.id = "close_long".to_string();
        other.action = SignalAction::Sell;
        other.target_position = PositionSide::Flat;
        other.previous_position = PositionSide::Long;
        assert!(window.try_claim("acct-1", &other, now));
    }

    #[test]
    fn test_new_bucket_allows_reclaim() {
        let window = DedupeWindow::new(5);
        let now = Utc::now();
        assert!(window.try_claim("acct-1", &signal(), now));
        assert!(window.try_claim("acct-1", &signal(), now + Duration::seconds(10)));
    }

    #[test]
    fn test_sweep_drops_stale_entries() {
        let window = DedupeWindow::new(1);
        let now = Utc::now();
        window.try_claim("acct-1", &signal(), now);
        window.try_claim("acct-2", &signal(), now + Duration::seconds(30));
        // Only the fresh claim survives the sweep.
        assert_eq!(window.seen.len(), 1);
    }
}
