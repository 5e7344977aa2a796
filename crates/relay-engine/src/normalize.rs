//! Quantity normalization into venue-legal order parameters.
//!
//! Opens below a venue minimum are rounded up, never silently
//! dropped; closes below a minimum fail with a named reason, never
//! rounded up, because a close must not exceed what exists.

use tracing::debug;

use relay_core::{ClientOrderId, MarginMode, OrderSide, Price, Quantity, SymbolSpec};
use relay_venue::{HedgeSide, OrderKind, OrderRequest, VenueProfile};

/// Normalization failure for a reduce-only order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeReject {
    /// Close quantity is below the venue minimum quantity.
    BelowMinimumClose { quantity: Quantity, min_qty: Quantity },
    /// Close notional is below the venue minimum notional.
    BelowNotionalClose { notional: rust_decimal::Decimal, min_notional: rust_decimal::Decimal },
    /// Quantity floored to zero and the order is reduce-only.
    ZeroQuantity,
}

impl std::fmt::Display for NormalizeReject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BelowMinimumClose { quantity, min_qty } => write!(
                f,
                "reduce-only quantity {quantity} below venue minimum {min_qty}"
            ),
            Self::BelowNotionalClose { notional, min_notional } => write!(
                f,
                "reduce-only notional {notional} below venue minimum {min_notional}"
            ),
            Self::ZeroQuantity => write!(f, "reduce-only quantity floored to zero"),
        }
    }
}

/// Build a venue-legal order from a base quantity in underlying units.
pub fn normalize_order(
    base_qty: Quantity,
    price: Price,
    side: OrderSide,
    reduce_only: bool,
    spec: &SymbolSpec,
    profile: &VenueProfile,
    margin_mode: MarginMode,
) -> Result<OrderRequest, NormalizeReject> {
    // Work in venue order units from here on.
    let mut quantity = spec.to_order_units(base_qty).floor_to_step(spec.lot_step);

    let below_min_qty = quantity < spec.min_qty;
    let notional = spec.to_underlying(quantity).notional(price);
    let below_notional =
        !spec.min_notional.is_zero() && !price.is_zero() && notional < spec.min_notional;

    if below_min_qty || below_notional || quantity.is_zero() {
        if reduce_only {
            if quantity.is_zero() {
                return Err(NormalizeReject::ZeroQuantity);
            }
            if below_min_qty {
                return Err(NormalizeReject::BelowMinimumClose {
                    quantity,
                    min_qty: spec.min_qty,
                });
            }
            return Err(NormalizeReject::BelowNotionalClose {
                notional,
                min_notional: spec.min_notional,
            });
        }

        // Opening order: round up to the larger of the two minimums.
        let mut bumped = spec.min_qty.ceil_to_step(spec.lot_step);
        if below_notional || spec.to_underlying(bumped).notional(price) < spec.min_notional {
            if price.is_positive() && !spec.min_notional.is_zero() {
                let needed = Quantity::new(spec.min_notional / price.inner());
                let needed = spec.to_order_units(needed).ceil_to_step(spec.lot_step);
                if needed > bumped {
                    bumped = needed;
                }
            }
        }
        debug!(
            symbol = %spec.symbol,
            computed = %quantity,
            bumped = %bumped,
            "Opening quantity below venue minimum, rounding up"
        );
        quantity = bumped;
    }

    let position_side = profile
        .supports_hedge_mode
        .then(|| HedgeSide::for_order(side, reduce_only));

    Ok(OrderRequest {
        symbol: spec.symbol.clone(),
        side,
        quantity,
        reduce_only,
        kind: OrderKind::Market,
        margin_mode,
        close_on_trigger: false,
        position_side,
        client_order_id: ClientOrderId::new(),
    })
}
