//! Scripted venue client for tests.
//!
//! Records every capability call and serves scripted state, so engine
//! tests can assert on exact venue interaction order without any
//! transport. Position state reacts to reduce-only fills so flip
//! reconciliation can be exercised end to end.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use rust_decimal::Decimal;

use relay_core::{
    MarginMode, PositionSide, PositionView, Price, Quantity, SymbolSpec, VenueId,
};

use crate::client::{BoxFuture, VenueClient};
use crate::error::{VenueError, VenueResult};
use crate::types::{Balance, OpenOrder, OrderAck, OrderKind, OrderRequest};

/// One recorded capability call.
#[derive(Debug, Clone, PartialEq)]
pub enum VenueCall {
    SymbolSpec(String),
    FetchPosition(String),
    FetchBalance,
    FetchMarkPrice(String),
    FetchOpenOrders(String),
    CancelAllOrders(String),
    CancelOrder(String, String),
    SetLeverage(String, u32),
    SetMarginMode(String, MarginMode),
    PlaceOrder(OrderRequest),
}

impl VenueCall {
    /// Short name for call counting in tests.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SymbolSpec(_) => "symbol_spec",
            Self::FetchPosition(_) => "fetch_position",
            Self::FetchBalance => "fetch_balance",
            Self::FetchMarkPrice(_) => "fetch_mark_price",
            Self::FetchOpenOrders(_) => "fetch_open_orders",
            Self::CancelAllOrders(_) => "cancel_all_orders",
            Self::CancelOrder(_, _) => "cancel_order",
            Self::SetLeverage(_, _) => "set_leverage",
            Self::SetMarginMode(_, _) => "set_margin_mode",
            Self::PlaceOrder(_) => "place_order",
        }
    }
}

/// Recording mock venue with scripted state.
pub struct MockVenue {
    venue: VenueId,
    calls: Mutex<Vec<VenueCall>>,
    spec: Mutex<Option<SymbolSpec>>,
    position: Mutex<PositionView>,
    balance: Mutex<Decimal>,
    mark_price: Mutex<Price>,
    open_orders: Mutex<Vec<OpenOrder>>,
    /// Scripted failures consumed by successive place_order calls.
    order_failures: Mutex<VecDeque<VenueError>>,
    /// Fraction of a reduce-only market order that actually fills.
    close_fill_fraction: Mutex<Decimal>,
    /// Whether a placed TriggerClose order immediately zeroes the
    /// position (the fallback's expected happy path).
    trigger_close_fills: AtomicBool,
    next_order_id: AtomicU64,
}

impl MockVenue {
    pub fn new(venue: VenueId) -> Self {
        Self {
            venue,
            calls: Mutex::new(Vec::new()),
            spec: Mutex::new(None),
            position: Mutex::new(PositionView::flat()),
            balance: Mutex::new(Decimal::ZERO),
            mark_price: Mutex::new(Price::ZERO),
            open_orders: Mutex::new(Vec::new()),
            order_failures: Mutex::new(VecDeque::new()),
            close_fill_fraction: Mutex::new(Decimal::ONE),
            trigger_close_fills: AtomicBool::new(true),
            next_order_id: AtomicU64::new(1),
        }
    }

    // === Scripting ===

    pub fn set_symbol_spec(&self, spec: SymbolSpec) {
        *self.spec.lock() = Some(spec);
    }

    pub fn set_position(&self, position: PositionView) {
        *self.position.lock() = position;
    }

    pub fn set_balance(&self, available: Decimal) {
        *self.balance.lock() = available;
    }

    pub fn set_mark_price(&self, price: Price) {
        *self.mark_price.lock() = price;
    }

    pub fn set_open_orders(&self, orders: Vec<OpenOrder>) {
        *self.open_orders.lock() = orders;
    }

    /// Queue a failure for the next place_order call.
    pub fn push_order_failure(&self, error: VenueError) {
        self.order_failures.lock().push_back(error);
    }

    /// Script partial fills on reduce-only market orders.
    pub fn set_close_fill_fraction(&self, fraction: Decimal) {
        *self.close_fill_fraction.lock() = fraction;
    }

    /// Script whether TriggerClose orders fill on placement.
    pub fn set_trigger_close_fills(&self, fills: bool) {
        self.trigger_close_fills.store(fills, Ordering::SeqCst);
    }

    // === Inspection ===

    pub fn calls(&self) -> Vec<VenueCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.name() == name).count()
    }

    /// All orders passed to place_order, in call order.
    pub fn placed_orders(&self) -> Vec<OrderRequest> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                VenueCall::PlaceOrder(req) => Some(req.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self) -> PositionView {
        self.position.lock().clone()
    }

    fn record(&self, call: VenueCall) {
        self.calls.lock().push(call);
    }

    /// Apply a filled reduce-only order to the scripted position.
    fn apply_close_fill(&self, request: &OrderRequest, fraction: Decimal) {
        let underlying = match self.spec.lock().as_ref() {
            Some(spec) => spec.to_underlying(request.quantity),
            None => request.quantity,
        };
        let mut position = self.position.lock();
        let filled = Quantity::new(underlying.inner() * fraction);
        let remaining = if filled >= position.quantity {
            Quantity::ZERO
        } else {
            position.quantity - filled
        };
        position.quantity = remaining;
        if remaining.is_zero() {
            position.side = PositionSide::Flat;
            position.entry_price = Price::ZERO;
        }
    }
}

impl VenueClient for MockVenue {
    fn venue(&self) -> VenueId {
        self.venue
    }

    fn symbol_spec(&self, symbol: &str) -> BoxFuture<'_, VenueResult<SymbolSpec>> {
        self.record(VenueCall::SymbolSpec(symbol.to_string()));
        let symbol = symbol.to_string();
        Box::pin(async move {
            self.spec
                .lock()
                .clone()
                .ok_or(VenueError::UnknownSymbol(symbol))
        })
    }

    fn fetch_position(&self, symbol: &str) -> BoxFuture<'_, VenueResult<PositionView>> {
        self.record(VenueCall::FetchPosition(symbol.to_string()));
        Box::pin(async move { Ok(self.position.lock().clone()) })
    }

    fn fetch_balance(&self) -> BoxFuture<'_, VenueResult<Balance>> {
        self.record(VenueCall::FetchBalance);
        Box::pin(async move {
            Ok(Balance {
                available: *self.balance.lock(),
            })
        })
    }

    fn fetch_mark_price(&self, symbol: &str) -> BoxFuture<'_, VenueResult<Price>> {
        self.record(VenueCall::FetchMarkPrice(symbol.to_string()));
        Box::pin(async move { Ok(*self.mark_price.lock()) })
    }

    fn fetch_open_orders(&self, symbol: &str) -> BoxFuture<'_, VenueResult<Vec<OpenOrder>>> {
        self.record(VenueCall::FetchOpenOrders(symbol.to_string()));
        Box::pin(async move { Ok(self.open_orders.lock().clone()) })
    }

    fn cancel_all_orders(&self, symbol: &str) -> BoxFuture<'_, VenueResult<()>> {
        self.record(VenueCall::CancelAllOrders(symbol.to_string()));
        Box::pin(async move {
            self.open_orders.lock().clear();
            Ok(())
        })
    }

    fn cancel_order(&self, symbol: &str, order_id: &str) -> BoxFuture<'_, VenueResult<()>> {
        self.record(VenueCall::CancelOrder(symbol.to_string(), order_id.to_string()));
        let order_id = order_id.to_string();
        Box::pin(async move {
            self.open_orders.lock().retain(|o| o.order_id != order_id);
            Ok(())
        })
    }

    fn set_leverage(&self, symbol: &str, leverage: u32) -> BoxFuture<'_, VenueResult<()>> {
        self.record(VenueCall::SetLeverage(symbol.to_string(), leverage));
        Box::pin(async move { Ok(()) })
    }

    fn set_margin_mode(&self, symbol: &str, mode: MarginMode) -> BoxFuture<'_, VenueResult<()>> {
        self.record(VenueCall::SetMarginMode(symbol.to_string(), mode));
        Box::pin(async move { Ok(()) })
    }

    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, VenueResult<OrderAck>> {
        self.record(VenueCall::PlaceOrder(request.clone()));
        Box::pin(async move {
            if let Some(error) = self.order_failures.lock().pop_front() {
                return Err(error);
            }

            let id = self.next_order_id.fetch_add(1, Ordering::SeqCst).to_string();

            match request.kind {
                OrderKind::Market if request.reduce_only => {
                    let fraction = *self.close_fill_fraction.lock();
                    self.apply_close_fill(&request, fraction);
                }
                OrderKind::TriggerClose { .. } => {
                    if self.trigger_close_fills.load(Ordering::SeqCst) {
                        self.apply_close_fill(&request, Decimal::ONE);
                    } else {
                        // Rests under the same id the ack reports.
                        self.open_orders.lock().push(OpenOrder {
                            order_id: id.clone(),
                            symbol: request.symbol.clone(),
                            side: request.side,
                            reduce_only: true,
                        });
                    }
                }
                OrderKind::Market => {}
            }

            Ok(OrderAck { order_id: id })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::OrderSide;
    use rust_decimal_macros::dec;

    fn long(qty: Decimal) -> PositionView {
        PositionView {
            side: PositionSide::Long,
            quantity: Quantity::new(qty),
            entry_price: Price::new(dec!(60000)),
            leverage: 10,
        }
    }

    #[tokio::test]
    async fn test_mock_records_calls() {
        let venue = MockVenue::new(VenueId::Binance);
        venue.fetch_balance().await.unwrap();
        venue.cancel_all_orders("BTCUSDT").await.unwrap();
        assert_eq!(venue.call_count("fetch_balance"), 1);
        assert_eq!(venue.call_count("cancel_all_orders"), 1);
    }

    #[tokio::test]
    async fn test_reduce_only_fill_zeroes_position() {
        let venue = MockVenue::new(VenueId::Binance);
        venue.set_position(long(dec!(0.01)));

        let mut req =
            OrderRequest::market("BTCUSDT", OrderSide::Sell, Quantity::new(dec!(0.01)));
        req.reduce_only = true;
        venue.place_order(req).await.unwrap();

        assert!(venue.position().is_flat());
    }

    #[tokio::test]
    async fn test_partial_close_leaves_residual() {
        let venue = MockVenue::new(VenueId::Binance);
        venue.set_position(long(dec!(0.010)));
        venue.set_close_fill_fraction(dec!(0.5));

        let mut req =
            OrderRequest::market("BTCUSDT", OrderSide::Sell, Quantity::new(dec!(0.010)));
        req.reduce_only = true;
        venue.place_order(req).await.unwrap();

        assert_eq!(venue.position().quantity.inner(), dec!(0.005));
    }

    #[tokio::test]
    async fn test_scripted_failure_consumed_once() {
        let venue = MockVenue::new(VenueId::Bybit);
        venue.push_order_failure(VenueError::Rejected {
            code: 110007,
            message: "insufficient margin".to_string(),
        });

        let req = OrderRequest::market("BTCUSD", OrderSide::Buy, Quantity::new(dec!(1)));
        assert!(venue.place_order(req.clone()).await.is_err());
        assert!(venue.place_order(req).await.is_ok());
    }
}
