//! Per-account execution pipeline.
//!
//! One signal against one account, start to finish: duplicate claim,
//! intent derivation, execution lock, then either the close path
//! (exact held quantity, sizing bypassed) or the open path (flip
//! reconcile, capital from the last account snapshot with a live
//! fallback, size, normalize, place).
//! Every recoverable condition becomes an `ExecutionResult` value;
//! this function never hands the dispatcher an `Err`, so one
//! account's trouble cannot abort the fan-out.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use relay_core::{
    AccountConfig, AccountSnapshot, ExecutionResult, Intent, Price, Signal, SymbolSpec,
};
use relay_venue::{classify, SpecCache, VenueClient, VenueError, VenueProfile};

use crate::config::EngineConfig;
use crate::dedupe::DedupeWindow;
use crate::intent::{derive_intent, Derived};
use crate::lock::{lock_key, DynExecutionLock, InProcessLocks};
use crate::normalize::normalize_order;
use crate::reconcile::{FlipOutcome, FlipReconciler};
use crate::retry::{PlaceOutcome, RetryPolicy};
use crate::sizing::RiskSizer;
use crate::snapshot::{DynSnapshotProvider, SnapshotStore};

/// Executes one signal for one account.
pub struct AccountExecutor {
    locks: DynExecutionLock,
    dedupe: DedupeWindow,
    sizer: RiskSizer,
    reconciler: FlipReconciler,
    retry: RetryPolicy,
    specs: SpecCache,
    snapshots: DynSnapshotProvider,
    snapshot_max_age: Duration,
}

impl AccountExecutor {
    /// Build an executor from config, with in-process locking.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_locks(config, Arc::new(InProcessLocks::new()))
    }

    /// Build an executor with a caller-supplied lock implementation
    /// (lease-based for multi-instance deployments).
    pub fn with_locks(config: EngineConfig, locks: DynExecutionLock) -> Self {
        Self {
            locks,
            dedupe: DedupeWindow::new(config.dedupe_window_secs),
            sizer: RiskSizer::new(config.sizer),
            reconciler: FlipReconciler::new(config.flip),
            retry: RetryPolicy::new(config.retry),
            specs: SpecCache::default(),
            snapshots: Arc::new(SnapshotStore::new()),
            snapshot_max_age: Duration::seconds(config.snapshot_max_age_secs),
        }
    }

    /// Attach the account-state snapshot feed. Without one, every
    /// open sizes from a live balance query.
    pub fn with_snapshots(mut self, snapshots: DynSnapshotProvider) -> Self {
        self.snapshots = snapshots;
        self
    }

    /// Run the full pipeline for `signal` against `account`.
    pub async fn execute(
        &self,
        signal: &Signal,
        account: &AccountConfig,
        client: &dyn VenueClient,
    ) -> ExecutionResult {
        let account_id = account.account_id.as_str();
        let symbol = account.symbol.as_str();
        let venue = account.venue;

        if !self.dedupe.try_claim(account_id, signal, Utc::now()) {
            return ExecutionResult::skipped(account_id, venue, symbol, "duplicate signal");
        }

        // Noop intents never take the lock.
        let intent = match derive_intent(signal) {
            Derived::Intent(intent) => intent,
            Derived::Noop(reason) => {
                return ExecutionResult::skipped(account_id, venue, symbol, reason.to_string())
            }
        };

        let _guard = match self.locks.acquire(&lock_key(account_id, symbol)).await {
            Ok(guard) => guard,
            Err(error) => {
                warn!(account = %account_id, %symbol, %error, "Execution lock not acquired");
                return ExecutionResult::failed(account_id, venue, symbol, error.to_string(), true);
            }
        };

        let spec = match self.specs.get(client, symbol).await {
            Ok(spec) => spec,
            Err(error) => return self.venue_failure(account, "symbol spec fetch", error),
        };
        let profile = VenueProfile::for_venue(venue);

        info!(
            account = %account_id,
            %symbol,
            %intent,
            signal = %signal.id,
            "Executing signal"
        );

        if intent.is_reduce_only() {
            self.close_position(account, client, intent, &spec, &profile)
                .await
        } else {
            self.open_position(account, client, intent, &spec, &profile)
                .await
        }
    }

    /// Close path: exact held quantity, no sizing.
    async fn close_position(
        &self,
        account: &AccountConfig,
        client: &dyn VenueClient,
        intent: Intent,
        spec: &SymbolSpec,
        profile: &VenueProfile,
    ) -> ExecutionResult {
        let account_id = account.account_id.as_str();
        let symbol = account.symbol.as_str();
        let venue = account.venue;

        let position = match client.fetch_position(symbol).await {
            Ok(position) => position,
            Err(error) => return self.venue_failure(account, "position fetch", error),
        };

        if position.is_flat() {
            debug!(account = %account_id, %symbol, "Nothing to close");
            return ExecutionResult::skipped(account_id, venue, symbol, "no open position");
        }
        if !position.same_direction(intent.target_side()) {
            return ExecutionResult::skipped(
                account_id,
                venue,
                symbol,
                format!("held {} position does not match {intent}", position.side),
            );
        }

        // Minimum-notional close checks want a price; a close must
        // still go through when the price feed hiccups.
        let price = client.fetch_mark_price(symbol).await.unwrap_or(Price::ZERO);

        let request = match normalize_order(
            position.quantity,
            price,
            intent.side(),
            true,
            spec,
            profile,
            account.margin_mode,
        ) {
            Ok(request) => request,
            Err(reject) => {
                warn!(account = %account_id, %symbol, %reject, "Close not normalizable");
                return ExecutionResult::failed(account_id, venue, symbol, reject.to_string(), false);
            }
        };

        let quantity = request.quantity;
        match self.retry.place(client, profile, request).await {
            PlaceOutcome::Placed(ack) => ExecutionResult::order_placed(
                account_id,
                venue,
                symbol,
                intent.side(),
                quantity,
                true,
                ack.order_id,
            ),
            PlaceOutcome::Retryable(reason) => {
                ExecutionResult::failed(account_id, venue, symbol, reason, true)
            }
            PlaceOutcome::Rejected(reason) => {
                ExecutionResult::failed(account_id, venue, symbol, reason, false)
            }
        }
    }

    /// Open path: flip first, then size against post-flip capital.
    async fn open_position(
        &self,
        account: &AccountConfig,
        client: &dyn VenueClient,
        intent: Intent,
        spec: &SymbolSpec,
        profile: &VenueProfile,
    ) -> ExecutionResult {
        let account_id = account.account_id.as_str();
        let symbol = account.symbol.as_str();
        let venue = account.venue;

        let flipped = match self
            .reconciler
            .ensure_no_opposition(client, symbol, intent, spec, profile, account.margin_mode)
            .await
        {
            FlipOutcome::Failed(reason) => {
                return ExecutionResult::failed(account_id, venue, symbol, reason, true)
            }
            FlipOutcome::Residual(remaining) => {
                warn!(account = %account_id, %symbol, %remaining, "Opening over residual position");
                true
            }
            FlipOutcome::Flat => true,
            FlipOutcome::NotNeeded => false,
        };

        // Venues reject no-op leverage/margin changes; tolerated.
        if let Err(error) = client.set_leverage(symbol, account.leverage).await {
            debug!(account = %account_id, %symbol, %error, "Leverage setup rejected");
        }
        if let Err(error) = client.set_margin_mode(symbol, account.margin_mode).await {
            debug!(account = %account_id, %symbol, %error, "Margin mode setup rejected");
        }

        // Sizing sees capital as it stands after any flip close; a
        // flip invalidates the cached snapshot by construction.
        let snapshot = if flipped {
            None
        } else {
            self.fresh_snapshot(account_id)
        };

        let available = match snapshot
            .as_ref()
            .map(|s| s.available_capital)
            .filter(|capital| *capital > Decimal::ZERO)
        {
            Some(capital) => {
                debug!(account = %account_id, %capital, "Sizing from cached snapshot");
                capital
            }
            None => match client.fetch_balance().await {
                Ok(balance) => balance.available,
                Err(error) => return self.venue_failure(account, "balance fetch", error),
            },
        };
        let price = match client.fetch_mark_price(symbol).await {
            Ok(price) => price,
            Err(error) => return self.venue_failure(account, "mark price fetch", error),
        };
        let same_direction = match snapshot.as_ref().and_then(|s| s.position(symbol)) {
            Some(view) => view.same_direction(intent.target_side()),
            None => match client.fetch_position(symbol).await {
                Ok(position) => position.same_direction(intent.target_side()),
                Err(error) => return self.venue_failure(account, "position fetch", error),
            },
        };

        let base_qty = match self
            .sizer
            .base_quantity(available, account, price, same_direction)
        {
            Ok(quantity) => quantity,
            Err(reject) => {
                warn!(account = %account_id, %symbol, %reject, "Sizing rejected");
                return ExecutionResult::failed(account_id, venue, symbol, reject.to_string(), false);
            }
        };

        let request = match normalize_order(
            base_qty,
            price,
            intent.side(),
            false,
            spec,
            profile,
            account.margin_mode,
        ) {
            Ok(request) => request,
            Err(reject) => {
                return ExecutionResult::failed(account_id, venue, symbol, reject.to_string(), false)
            }
        };

        let quantity = request.quantity;
        match self.retry.place(client, profile, request).await {
            PlaceOutcome::Placed(ack) => ExecutionResult::order_placed(
                account_id,
                venue,
                symbol,
                intent.side(),
                quantity,
                false,
                ack.order_id,
            ),
            PlaceOutcome::Retryable(reason) => {
                ExecutionResult::failed(account_id, venue, symbol, reason, true)
            }
            PlaceOutcome::Rejected(reason) => {
                ExecutionResult::failed(account_id, venue, symbol, reason, false)
            }
        }
    }

    /// The last snapshot for this account, if it is recent enough to
    /// trust for sizing.
    fn fresh_snapshot(&self, account_id: &str) -> Option<AccountSnapshot> {
        self.snapshots
            .last_snapshot(account_id)
            .filter(|snapshot| Utc::now() - snapshot.as_of < self.snapshot_max_age)
    }

    fn venue_failure(
        &self,
        account: &AccountConfig,
        stage: &str,
        error: VenueError,
    ) -> ExecutionResult {
        let retryable = classify(&error, account.venue).is_retryable();
        warn!(
            account = %account.account_id,
            symbol = %account.symbol,
            %stage,
            %error,
            "Venue call failed in pipeline"
        );
        ExecutionResult::failed(
            &account.account_id,
            account.venue,
            &account.symbol,
            format!("{stage} failed: {error}"),
            retryable,
        )
    }
}
