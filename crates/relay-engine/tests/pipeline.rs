//! End-to-end pipeline and dispatch tests against the scripted venue.
//!
//! Covers the engine's externally observable guarantees:
//! - ambiguous signals produce no orders
//! - duplicate deliveries execute once
//! - closes use the exact held quantity and never consult sizing
//! - opposing positions are closed before opens, and sizing sees
//!   post-close capital
//! - sizing trusts a fresh account snapshot and falls back to a live
//!   balance query when it is missing, stale, or zero
//! - sub-minimum closes fail with a reason instead of rounding up
//! - one account's failure never blocks the rest of a fan-out

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use relay_core::{
    AccountConfig, AccountSnapshot, CredentialHandle, MarginMode, OrderSide, PositionSide,
    PositionView, Price, Quantity, Signal, SignalAction, SymbolSpec, VenueId,
};
use relay_engine::{
    AccountExecutor, AccountHandle, Dispatcher, EngineConfig, FlipConfig, SnapshotStore,
};
use relay_venue::{MockVenue, VenueCall, VenueError};

fn fast_config() -> EngineConfig {
    EngineConfig {
        flip: FlipConfig {
            poll_interval_ms: 10,
            trigger_wait_ms: 10,
            ..FlipConfig::default()
        },
        // Wide bucket so duplicate tests cannot straddle a boundary.
        dedupe_window_secs: 3600,
        ..EngineConfig::default()
    }
}

fn executor() -> AccountExecutor {
    AccountExecutor::new(fast_config())
}

fn account(id: &str, venue: VenueId) -> AccountConfig {
    AccountConfig {
        account_id: id.to_string(),
        venue,
        symbol: "BTCUSDT".to_string(),
        leverage: 5,
        risk_pct: 10,
        margin_mode: MarginMode::Cross,
        reserved_capital: Decimal::ZERO,
        fixed_capital: Decimal::ZERO,
        credential: CredentialHandle::new(format!("cred-{id}")),
        subscription_expires_at: None,
    }
}

fn signal(id: &str, action: SignalAction, target: PositionSide, previous: PositionSide) -> Signal {
    Signal {
        id: id.to_string(),
        action,
        target_position: target,
        previous_position: previous,
    }
}

fn open_long() -> Signal {
    signal(
        "open_long",
        SignalAction::Buy,
        PositionSide::Long,
        PositionSide::Flat,
    )
}

fn close_long() -> Signal {
    signal(
        "close_long",
        SignalAction::Sell,
        PositionSide::Flat,
        PositionSide::Long,
    )
}

fn btc_spec() -> SymbolSpec {
    SymbolSpec::unit_denominated(
        "BTCUSDT",
        Quantity::new(dec!(0.001)),
        Quantity::new(dec!(0.001)),
        Decimal::ZERO,
    )
}

fn venue_with_capital(available: Decimal, mark: Decimal) -> Arc<MockVenue> {
    let venue = Arc::new(MockVenue::new(VenueId::Binance));
    venue.set_symbol_spec(btc_spec());
    venue.set_balance(available);
    venue.set_mark_price(Price::new(mark));
    venue
}

fn long_position(qty: Decimal) -> PositionView {
    PositionView {
        side: PositionSide::Long,
        quantity: Quantity::new(qty),
        entry_price: Price::new(dec!(60000)),
        leverage: 10,
    }
}

// ============================================================================
// Open path
// ============================================================================

// 1000 available x 10% risk x 5 leverage / 50000 = 0.01 BTC.
#[tokio::test]
async fn test_open_sizes_from_capital_risk_and_leverage() {
    let venue = venue_with_capital(dec!(1000), dec!(50000));
    let result = executor()
        .execute(&open_long(), &account("a1", VenueId::Binance), venue.as_ref())
        .await;

    assert!(result.placed, "expected placement, got {:?}", result.reason);
    assert_eq!(result.side, Some(OrderSide::Buy));
    assert_eq!(result.amount, Some(Quantity::new(dec!(0.01))));
    assert!(!result.reduce_only);

    let orders = venue.placed_orders();
    assert_eq!(orders.len(), 1);
    assert!(!orders[0].reduce_only);
}

#[tokio::test]
async fn test_pyramiding_same_direction_is_damped() {
    let venue = venue_with_capital(dec!(1000), dec!(50000));
    venue.set_position(long_position(dec!(0.02)));

    let result = executor()
        .execute(&open_long(), &account("a1", VenueId::Binance), venue.as_ref())
        .await;

    assert!(result.placed);
    // Half of the plain 0.01 entry.
    assert_eq!(result.amount, Some(Quantity::new(dec!(0.005))));
}

#[tokio::test]
async fn test_open_against_opposing_position_flips_first() {
    let venue = venue_with_capital(dec!(1000), dec!(50000));
    venue.set_position(PositionView {
        side: PositionSide::Short,
        quantity: Quantity::new(dec!(0.02)),
        entry_price: Price::new(dec!(60000)),
        leverage: 10,
    });

    let result = executor()
        .execute(&open_long(), &account("a1", VenueId::Binance), venue.as_ref())
        .await;

    assert!(result.placed, "expected placement, got {:?}", result.reason);

    let orders = venue.placed_orders();
    assert_eq!(orders.len(), 2);
    // First the reduce-only buy closing the short, exactly 0.02.
    assert!(orders[0].reduce_only);
    assert_eq!(orders[0].side, OrderSide::Buy);
    assert_eq!(orders[0].quantity, Quantity::new(dec!(0.02)));
    // Then the sized opening buy.
    assert!(!orders[1].reduce_only);
    assert_eq!(orders[1].quantity, Quantity::new(dec!(0.01)));

    // Sizing reads capital only after the closing order went out.
    let calls = venue.calls();
    let close_idx = calls
        .iter()
        .position(|c| matches!(c, VenueCall::PlaceOrder(o) if o.reduce_only))
        .unwrap();
    let balance_idx = calls
        .iter()
        .position(|c| matches!(c, VenueCall::FetchBalance))
        .unwrap();
    assert!(close_idx < balance_idx);

    // Resting orders were cleared before the close.
    let cancel_idx = calls
        .iter()
        .position(|c| matches!(c, VenueCall::CancelAllOrders(_)))
        .unwrap();
    assert!(cancel_idx < close_idx);
}

#[tokio::test]
async fn test_leverage_setup_precedes_placement() {
    let venue = venue_with_capital(dec!(1000), dec!(50000));
    let result = executor()
        .execute(&open_long(), &account("a1", VenueId::Binance), venue.as_ref())
        .await;

    assert!(result.placed);
    let calls = venue.calls();
    let lev_idx = calls
        .iter()
        .position(|c| matches!(c, VenueCall::SetLeverage(_, 5)))
        .unwrap();
    let place_idx = calls
        .iter()
        .position(|c| matches!(c, VenueCall::PlaceOrder(_)))
        .unwrap();
    assert!(lev_idx < place_idx);
}

// ============================================================================
// Account snapshots
// ============================================================================

fn store_with_snapshot(account_id: &str, capital: Decimal, age: Duration) -> Arc<SnapshotStore> {
    let store = Arc::new(SnapshotStore::new());
    store.record(
        account_id,
        AccountSnapshot {
            available_capital: capital,
            positions: vec![("BTCUSDT".to_string(), PositionView::flat())],
            as_of: Utc::now() - age,
        },
    );
    store
}

#[tokio::test]
async fn test_fresh_snapshot_sizes_without_balance_query() {
    // Venue balance deliberately zero: a live query would fail sizing.
    let venue = venue_with_capital(Decimal::ZERO, dec!(50000));
    let store = store_with_snapshot("a1", dec!(1000), Duration::zero());
    let executor = executor().with_snapshots(store);

    let result = executor
        .execute(&open_long(), &account("a1", VenueId::Binance), venue.as_ref())
        .await;

    assert!(result.placed, "expected placement, got {:?}", result.reason);
    assert_eq!(result.amount, Some(Quantity::new(dec!(0.01))));
    assert_eq!(venue.call_count("fetch_balance"), 0);
    // The snapshot also answers pyramiding; only reconciliation
    // queried the live position.
    assert_eq!(venue.call_count("fetch_position"), 1);
}

#[tokio::test]
async fn test_stale_snapshot_falls_back_to_live_balance() {
    let venue = venue_with_capital(dec!(1000), dec!(50000));
    let store = store_with_snapshot("a1", dec!(9999), Duration::hours(1));
    let executor = executor().with_snapshots(store);

    let result = executor
        .execute(&open_long(), &account("a1", VenueId::Binance), venue.as_ref())
        .await;

    assert!(result.placed);
    // Sized from the live 1000, not the stale 9999.
    assert_eq!(result.amount, Some(Quantity::new(dec!(0.01))));
    assert_eq!(venue.call_count("fetch_balance"), 1);
}

#[tokio::test]
async fn test_zero_capital_snapshot_falls_back_to_live_balance() {
    let venue = venue_with_capital(dec!(1000), dec!(50000));
    let store = store_with_snapshot("a1", Decimal::ZERO, Duration::zero());
    let executor = executor().with_snapshots(store);

    let result = executor
        .execute(&open_long(), &account("a1", VenueId::Binance), venue.as_ref())
        .await;

    assert!(result.placed);
    assert_eq!(result.amount, Some(Quantity::new(dec!(0.01))));
    assert_eq!(venue.call_count("fetch_balance"), 1);
}

#[tokio::test]
async fn test_flip_invalidates_cached_snapshot() {
    let venue = venue_with_capital(dec!(1000), dec!(50000));
    venue.set_position(PositionView {
        side: PositionSide::Short,
        quantity: Quantity::new(dec!(0.02)),
        entry_price: Price::new(dec!(60000)),
        leverage: 10,
    });
    // Fresh but pre-flip; the close it never saw changed the balance.
    let store = store_with_snapshot("a1", dec!(9999), Duration::zero());
    let executor = executor().with_snapshots(store);

    let result = executor
        .execute(&open_long(), &account("a1", VenueId::Binance), venue.as_ref())
        .await;

    assert!(result.placed, "expected placement, got {:?}", result.reason);
    // Sized from the live post-close 1000, not the snapshot's 9999.
    assert_eq!(result.amount, Some(Quantity::new(dec!(0.01))));
    assert_eq!(venue.call_count("fetch_balance"), 1);
}

// ============================================================================
// Close path
// ============================================================================

#[tokio::test]
async fn test_close_uses_exact_held_quantity_without_sizing() {
    let venue = venue_with_capital(dec!(1000), dec!(60000));
    venue.set_position(long_position(dec!(0.01)));

    let result = executor()
        .execute(&close_long(), &account("a1", VenueId::Binance), venue.as_ref())
        .await;

    assert!(result.placed, "expected placement, got {:?}", result.reason);
    assert_eq!(result.side, Some(OrderSide::Sell));
    assert_eq!(result.amount, Some(Quantity::new(dec!(0.01))));
    assert!(result.reduce_only);

    // The sizer was never consulted.
    assert_eq!(venue.call_count("fetch_balance"), 0);
}

#[tokio::test]
async fn test_close_with_no_position_is_skipped() {
    let venue = venue_with_capital(dec!(1000), dec!(60000));

    let result = executor()
        .execute(&close_long(), &account("a1", VenueId::Binance), venue.as_ref())
        .await;

    assert!(!result.placed);
    assert!(result.skipped);
    assert_eq!(venue.call_count("place_order"), 0);
}

#[tokio::test]
async fn test_close_below_minimum_fails_with_reason() {
    let venue = venue_with_capital(dec!(1000), dec!(60000));
    venue.set_position(long_position(dec!(0.0004)));

    let result = executor()
        .execute(&close_long(), &account("a1", VenueId::Binance), venue.as_ref())
        .await;

    assert!(!result.placed);
    assert!(!result.skipped);
    assert!(!result.retryable);
    assert!(result.reason.is_some());
    assert_eq!(venue.call_count("place_order"), 0);
}

// ============================================================================
// Signal hygiene
// ============================================================================

#[tokio::test]
async fn test_ambiguous_signal_touches_no_venue() {
    let venue = venue_with_capital(dec!(1000), dec!(50000));
    // Label says open long, action says sell.
    let bad = signal(
        "open_long",
        SignalAction::Sell,
        PositionSide::Long,
        PositionSide::Flat,
    );

    let result = executor()
        .execute(&bad, &account("a1", VenueId::Binance), venue.as_ref())
        .await;

    assert!(!result.placed);
    assert!(result.skipped);
    assert!(venue.calls().is_empty());
}

#[tokio::test]
async fn test_duplicate_delivery_executes_once() {
    let venue = venue_with_capital(dec!(1000), dec!(50000));
    let executor = executor();
    let account = account("a1", VenueId::Binance);

    let first = executor.execute(&open_long(), &account, venue.as_ref()).await;
    let second = executor.execute(&open_long(), &account, venue.as_ref()).await;

    assert!(first.placed);
    assert!(!second.placed);
    assert!(second.skipped);
    assert_eq!(venue.call_count("place_order"), 1);
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_one_failing_account_does_not_block_others() {
    let executor = Arc::new(executor());
    let dispatcher = Dispatcher::new(executor, 8);

    let good_a = venue_with_capital(dec!(1000), dec!(50000));
    let bad = venue_with_capital(dec!(1000), dec!(50000));
    let good_b = venue_with_capital(dec!(1000), dec!(50000));
    bad.push_order_failure(VenueError::Rejected {
        code: -9999,
        message: "exchange maintenance".into(),
    });

    let handles = vec![
        AccountHandle {
            config: account("a1", VenueId::Binance),
            client: good_a.clone(),
        },
        AccountHandle {
            config: account("a2", VenueId::Binance),
            client: bad.clone(),
        },
        AccountHandle {
            config: account("a3", VenueId::Binance),
            client: good_b.clone(),
        },
    ];

    let outcome = dispatcher.dispatch(&open_long(), handles).await;

    assert_eq!(outcome.dispatched, 3);
    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.placed_count(), 2);

    let failed: Vec<_> = outcome.results.iter().filter(|r| !r.placed).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].account_id, "a2");
    assert!(!failed[0].retryable);
}

#[tokio::test]
async fn test_expired_subscription_never_enters_pipeline() {
    let executor = Arc::new(executor());
    let dispatcher = Dispatcher::new(executor, 8);

    let active = venue_with_capital(dec!(1000), dec!(50000));
    let lapsed = venue_with_capital(dec!(1000), dec!(50000));

    let mut expired = account("a2", VenueId::Binance);
    expired.subscription_expires_at = Some(Utc::now() - Duration::hours(1));

    let handles = vec![
        AccountHandle {
            config: account("a1", VenueId::Binance),
            client: active.clone(),
        },
        AccountHandle {
            config: expired,
            client: lapsed.clone(),
        },
    ];

    let outcome = dispatcher.dispatch(&open_long(), handles).await;

    assert_eq!(outcome.placed_count(), 1);
    let expired_result = outcome
        .results
        .iter()
        .find(|r| r.account_id == "a2")
        .unwrap();
    assert!(!expired_result.placed);
    assert!(!expired_result.retryable);
    // The lapsed account's venue was never touched.
    assert!(lapsed.calls().is_empty());
}

#[tokio::test]
async fn test_fan_out_completes_under_narrow_worker_limit() {
    let executor = Arc::new(executor());
    let dispatcher = Dispatcher::new(executor, 1);

    let handles: Vec<AccountHandle> = (0..4)
        .map(|i| AccountHandle {
            config: account(&format!("a{i}"), VenueId::Binance),
            client: venue_with_capital(dec!(1000), dec!(50000)),
        })
        .collect();

    let outcome = dispatcher.dispatch(&open_long(), handles).await;

    assert_eq!(outcome.dispatched, 4);
    assert_eq!(outcome.placed_count(), 4);
}
