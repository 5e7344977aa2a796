//! Execution results and dispatch aggregates.
//!
//! One `ExecutionResult` per (signal, account) pair. Recoverable
//! conditions inside the pipeline surface here as values; the
//! dispatcher never receives an error for a per-account task.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::account::VenueId;
use crate::decimal::Quantity;
use crate::signal::OrderSide;

/// Client order ID for idempotent order submission.
///
/// Every order carries a unique id so a retried submission can be
/// distinguished from a duplicate by the venue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new unique client order ID.
    ///
    /// Format: `relay_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("relay_{ts}_{uuid_short}"))
    }

    /// Create from an existing string (for parsing responses).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one per-account pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Account the result belongs to.
    pub account_id: String,
    /// Whether an order was placed on the venue.
    pub placed: bool,
    /// Venue the account trades on.
    pub venue: VenueId,
    /// Traded symbol.
    pub symbol: String,
    /// Order side, when an order was attempted.
    pub side: Option<OrderSide>,
    /// Order quantity in venue order units, when placed.
    pub amount: Option<Quantity>,
    /// Whether the order was reduce-only.
    pub reduce_only: bool,
    /// Venue order id, when placed.
    pub order_id: Option<String>,
    /// Reason for skip or failure.
    pub reason: Option<String>,
    /// Whether the caller may resubmit (transient venue condition).
    pub retryable: bool,
    /// Whether this was a deliberate no-action outcome rather than a
    /// failure.
    #[serde(default)]
    pub skipped: bool,
}

impl ExecutionResult {
    /// A successfully placed order.
    pub fn order_placed(
        account_id: impl Into<String>,
        venue: VenueId,
        symbol: impl Into<String>,
        side: OrderSide,
        amount: Quantity,
        reduce_only: bool,
        order_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            placed: true,
            venue,
            symbol: symbol.into(),
            side: Some(side),
            amount: Some(amount),
            reduce_only,
            order_id: Some(order_id.into()),
            reason: None,
            retryable: false,
            skipped: false,
        }
    }

    /// A deliberate no-action outcome (noop intent, duplicate signal,
    /// expired subscription).
    pub fn skipped(
        account_id: impl Into<String>,
        venue: VenueId,
        symbol: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            placed: false,
            venue,
            symbol: symbol.into(),
            side: None,
            amount: None,
            reduce_only: false,
            order_id: None,
            reason: Some(reason.into()),
            retryable: false,
            skipped: true,
        }
    }

    /// A failed execution.
    pub fn failed(
        account_id: impl Into<String>,
        venue: VenueId,
        symbol: impl Into<String>,
        reason: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            placed: false,
            venue,
            symbol: symbol.into(),
            side: None,
            amount: None,
            reduce_only: false,
            order_id: None,
            reason: Some(reason.into()),
            retryable,
            skipped: false,
        }
    }
}

/// Aggregate of one fan-out dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Number of accounts that entered dispatch.
    pub dispatched: usize,
    /// One result per dispatched account.
    pub results: Vec<ExecutionResult>,
}

impl DispatchOutcome {
    /// Count of results that placed an order.
    pub fn placed_count(&self) -> usize {
        self.results.iter().filter(|r| r.placed).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_client_order_id_unique() {
        let a = ClientOrderId::new();
        let b = ClientOrderId::new();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("relay_"));
    }

    #[test]
    fn test_order_placed_result() {
        let result = ExecutionResult::order_placed(
            "acct-1",
            VenueId::Binance,
            "BTCUSDT",
            OrderSide::Buy,
            Quantity::new(dec!(0.01)),
            false,
            "12345",
        );
        assert!(result.placed);
        assert!(!result.retryable);
        assert_eq!(result.order_id.as_deref(), Some("12345"));
    }

    #[test]
    fn test_skipped_is_never_retryable() {
        let result = ExecutionResult::skipped("acct-1", VenueId::Bybit, "BTCUSD", "noop");
        assert!(!result.placed);
        assert!(!result.retryable);
        assert_eq!(result.reason.as_deref(), Some("noop"));
    }

    #[test]
    fn test_dispatch_outcome_placed_count() {
        let outcome = DispatchOutcome {
            dispatched: 2,
            results: vec![
                ExecutionResult::order_placed(
                    "a",
                    VenueId::Binance,
                    "BTCUSDT",
                    OrderSide::Sell,
                    Quantity::new(dec!(1)),
                    true,
                    "1",
                ),
                ExecutionResult::skipped("b", VenueId::Binance, "BTCUSDT", "duplicate"),
            ],
        };
        assert_eq!(outcome.placed_count(), 1);
    }
}
