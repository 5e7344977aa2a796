//! Prometheus metrics for the signal relay.
//!
//! Observability for the execution pipeline:
//! - Signal fan-out volume
//! - Orders placed per venue
//! - Skipped and failed executions
//! - Flip fallback activations
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{register_counter, register_counter_vec, Counter, CounterVec};

use relay_core::ExecutionResult;

/// Total signals entering dispatch.
pub static SIGNALS_DISPATCHED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "relay_signals_dispatched_total",
        "Total signals entering dispatch"
    )
    .unwrap()
});

/// Total orders placed on venues.
pub static ORDERS_PLACED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "relay_orders_placed_total",
        "Total orders placed",
        &["venue", "side", "reduce_only"]
    )
    .unwrap()
});

/// Total executions skipped (noop intent, duplicate, no position).
pub static EXECUTIONS_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "relay_executions_skipped_total",
        "Total executions deliberately skipped",
        &["venue"]
    )
    .unwrap()
});

/// Total failed executions.
pub static EXECUTIONS_FAILED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "relay_executions_failed_total",
        "Total failed executions",
        &["venue", "retryable"]
    )
    .unwrap()
});

/// Total conditional-order flip fallbacks.
pub static FLIP_FALLBACKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "relay_flip_fallbacks_total",
        "Total flip reconciliations that reached the conditional fallback",
        &["venue"]
    )
    .unwrap()
});

/// Facade over the static metrics.
pub struct Metrics;

impl Metrics {
    /// Record a signal entering dispatch.
    pub fn signal_dispatched() {
        SIGNALS_DISPATCHED_TOTAL.inc();
    }

    /// Record an order placement.
    pub fn order_placed(venue: &str, side: &str, reduce_only: bool) {
        ORDERS_PLACED_TOTAL
            .with_label_values(&[venue, side, if reduce_only { "true" } else { "false" }])
            .inc();
    }

    /// Record a skipped execution.
    pub fn execution_skipped(venue: &str) {
        EXECUTIONS_SKIPPED_TOTAL.with_label_values(&[venue]).inc();
    }

    /// Record a failed execution.
    pub fn execution_failed(venue: &str, retryable: bool) {
        EXECUTIONS_FAILED_TOTAL
            .with_label_values(&[venue, if retryable { "true" } else { "false" }])
            .inc();
    }

    /// Record a flip fallback activation.
    pub fn flip_fallback(venue: &str) {
        FLIP_FALLBACKS_TOTAL.with_label_values(&[venue]).inc();
    }

    /// Record one per-account result.
    pub fn record_result(result: &ExecutionResult) {
        let venue = result.venue.to_string();
        if result.placed {
            if let Some(side) = result.side {
                Self::order_placed(&venue, &side.to_string(), result.reduce_only);
            }
        } else if result.skipped {
            Self::execution_skipped(&venue);
        } else {
            Self::execution_failed(&venue, result.retryable);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{OrderSide, Quantity, VenueId};
    use rust_decimal::Decimal;

    #[test]
    fn test_record_placed_result() {
        let result = ExecutionResult::order_placed(
            "acct-1",
            VenueId::Binance,
            "BTCUSDT",
            OrderSide::Buy,
            Quantity::new(Decimal::ONE),
            false,
            "123",
        );
        Metrics::record_result(&result);
        assert!(
            ORDERS_PLACED_TOTAL
                .with_label_values(&["binance", "buy", "false"])
                .get()
                >= 1.0
        );
    }

    #[test]
    fn test_counters_register_once() {
        Metrics::signal_dispatched();
        Metrics::signal_dispatched();
        assert!(SIGNALS_DISPATCHED_TOTAL.get() >= 2.0);
    }
}
