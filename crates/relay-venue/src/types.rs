//! Wire-facing order types for the venue capability interface.

use serde::{Deserialize, Serialize};
use std::fmt;

use relay_core::{ClientOrderId, MarginMode, OrderSide, Price, Quantity};

/// Hedge-mode position direction tag.
///
/// Venues that track long and short legs separately require every
/// order to name the leg it affects. Derived from side + reduce-only
/// by the normalizer, never supplied by callers directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HedgeSide {
    Long,
    Short,
}

impl HedgeSide {
    /// The leg an order touches: opens touch the leg matching the
    /// order side, closes touch the opposite leg.
    pub fn for_order(side: OrderSide, reduce_only: bool) -> Self {
        match (side, reduce_only) {
            (OrderSide::Buy, false) | (OrderSide::Sell, true) => Self::Long,
            (OrderSide::Sell, false) | (OrderSide::Buy, true) => Self::Short,
        }
    }
}

impl fmt::Display for HedgeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// Kind of order to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Immediate market order.
    Market,
    /// Venue-native conditional order that closes at any price once
    /// the trigger is touched. Used by the flip residual fallback.
    TriggerClose { trigger_price: Price },
}

/// A fully normalized order ready for submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Symbol in venue notation.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Quantity in venue order units (contracts or underlying).
    pub quantity: Quantity,
    /// Only decrease, never increase, position size.
    pub reduce_only: bool,
    /// Market or conditional close.
    pub kind: OrderKind,
    /// Margin mode to apply to the order, where supported inline.
    pub margin_mode: MarginMode,
    /// Force close even with resting orders on the book.
    pub close_on_trigger: bool,
    /// Hedge-mode leg tag, when the venue requires one.
    pub position_side: Option<HedgeSide>,
    /// Idempotency key for retried submissions.
    pub client_order_id: ClientOrderId,
}

impl OrderRequest {
    /// A plain market order with no venue extras.
    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: Quantity) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            reduce_only: false,
            kind: OrderKind::Market,
            margin_mode: MarginMode::Cross,
            close_on_trigger: false,
            position_side: None,
            client_order_id: ClientOrderId::new(),
        }
    }

    /// Same order under a fresh client order id, scaled by a factor.
    ///
    /// Used by the insufficient-notional retry ladder; the fresh id
    /// keeps the venue from collapsing the retry into the original.
    pub fn scaled(&self, factor: rust_decimal::Decimal) -> Self {
        Self {
            quantity: self.quantity * factor,
            client_order_id: ClientOrderId::new(),
            ..self.clone()
        }
    }
}

/// Venue acknowledgement of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Venue-assigned order id.
    pub order_id: String,
}

/// A resting open order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub reduce_only: bool,
}

/// Account balance in quote currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub available: rust_decimal::Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_hedge_side_for_order() {
        // Opening buy touches the long leg; closing sell also does.
        assert_eq!(HedgeSide::for_order(OrderSide::Buy, false), HedgeSide::Long);
        assert_eq!(HedgeSide::for_order(OrderSide::Sell, true), HedgeSide::Long);
        // Opening sell touches the short leg; closing buy also does.
        assert_eq!(HedgeSide::for_order(OrderSide::Sell, false), HedgeSide::Short);
        assert_eq!(HedgeSide::for_order(OrderSide::Buy, true), HedgeSide::Short);
    }

    #[test]
    fn test_scaled_keeps_fields_but_fresh_id() {
        let order = OrderRequest::market("BTCUSDT", OrderSide::Buy, Quantity::new(dec!(0.01)));
        let scaled = order.scaled(dec!(1.1));
        assert_eq!(scaled.quantity.inner(), dec!(0.011));
        assert_eq!(scaled.symbol, order.symbol);
        assert_eq!(scaled.side, order.side);
        assert_ne!(scaled.client_order_id, order.client_order_id);
    }
}
