//! Bounded fan-out of one signal across accounts.
//!
//! Every matching account gets its own pipeline task; a semaphore
//! bounds how many run at once. Account isolation is absolute: a
//! failing or even panicking account task becomes a failed result in
//! the outcome, never an abort of the dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use relay_core::{AccountConfig, DispatchOutcome, ExecutionResult, Signal, VenueId};
use relay_venue::DynVenueClient;

use crate::pipeline::AccountExecutor;

/// One account paired with its venue client.
#[derive(Clone)]
pub struct AccountHandle {
    pub config: AccountConfig,
    pub client: DynVenueClient,
}

/// Fans one signal out to all accounts.
pub struct Dispatcher {
    executor: Arc<AccountExecutor>,
    worker_limit: usize,
}

impl Dispatcher {
    pub fn new(executor: Arc<AccountExecutor>, worker_limit: usize) -> Self {
        Self {
            executor,
            worker_limit: worker_limit.max(1),
        }
    }

    /// Execute `signal` against every account, at most `worker_limit`
    /// concurrently. Returns one result per account, in no
    /// particular order.
    pub async fn dispatch(&self, signal: &Signal, accounts: Vec<AccountHandle>) -> DispatchOutcome {
        let dispatched = accounts.len();
        info!(
            signal = %signal.id,
            accounts = dispatched,
            "Dispatching signal"
        );
        relay_telemetry::Metrics::signal_dispatched();

        let semaphore = Arc::new(Semaphore::new(self.worker_limit));
        let mut tasks: JoinSet<ExecutionResult> = JoinSet::new();
        let mut task_meta: HashMap<tokio::task::Id, (String, VenueId, String)> = HashMap::new();
        let mut results = Vec::with_capacity(dispatched);
        let now = Utc::now();

        for handle in accounts {
            let config = handle.config;

            // Lapsed subscriptions never enter the pipeline.
            if !config.subscription_active(now) {
                warn!(account = %config.account_id, "Subscription expired, not executing");
                results.push(ExecutionResult::failed(
                    &config.account_id,
                    config.venue,
                    &config.symbol,
                    "subscription expired",
                    false,
                ));
                continue;
            }

            let meta = (
                config.account_id.clone(),
                config.venue,
                config.symbol.clone(),
            );
            let executor = Arc::clone(&self.executor);
            let semaphore = Arc::clone(&semaphore);
            let client = handle.client;
            let signal = signal.clone();

            let abort = tasks.spawn(async move {
                // Closed only when the dispatcher is dropped mid-join.
                let _permit = semaphore.acquire_owned().await;
                executor.execute(&signal, &config, client.as_ref()).await
            });
            task_meta.insert(abort.id(), meta);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, result)) => results.push(result),
                Err(join_error) => {
                    // A panicked account task is a failed result, not
                    // a failed dispatch.
                    warn!(%join_error, "Account task did not complete");
                    if let Some((account_id, venue, symbol)) = task_meta.remove(&join_error.id()) {
                        results.push(ExecutionResult::failed(
                            account_id,
                            venue,
                            symbol,
                            format!("execution task failed: {join_error}"),
                            false,
                        ));
                    }
                }
            }
        }

        for result in &results {
            relay_telemetry::Metrics::record_result(result);
        }

        let outcome = DispatchOutcome {
            dispatched,
            results,
        };
        info!(
            signal = %signal.id,
            placed = outcome.placed_count(),
            total = outcome.dispatched,
            "Dispatch complete"
        );
        outcome
    }
}
