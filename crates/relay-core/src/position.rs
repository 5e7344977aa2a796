//! Read-only position and balance views.
//!
//! `AccountSnapshot` is the best-effort cached view supplied by the
//! account-state collaborator; `PositionView` also appears as the
//! authoritative answer of a live venue query. The engine never
//! mutates either, it only places orders whose fills eventually
//! update them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Price, Quantity};
use crate::signal::PositionSide;

/// Snapshot of one position on one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionView {
    /// Long, short, or flat.
    pub side: PositionSide,
    /// Absolute position size in underlying units.
    pub quantity: Quantity,
    /// Average entry price. Zero when flat.
    pub entry_price: Price,
    /// Position leverage as reported by the venue.
    pub leverage: u32,
}

impl PositionView {
    /// A flat (no position) view.
    pub fn flat() -> Self {
        Self {
            side: PositionSide::Flat,
            quantity: Quantity::ZERO,
            entry_price: Price::ZERO,
            leverage: 1,
        }
    }

    /// Whether there is no open exposure.
    pub fn is_flat(&self) -> bool {
        self.side.is_flat() || self.quantity.is_zero()
    }

    /// Whether this position mathematically opposes the given side.
    ///
    /// Flat opposes nothing; an empty position opposes nothing.
    pub fn opposes(&self, side: PositionSide) -> bool {
        !self.is_flat() && !side.is_flat() && self.side == side.opposite()
    }

    /// Whether this position is in the same direction as the given
    /// side (used for pyramiding detection).
    pub fn same_direction(&self, side: PositionSide) -> bool {
        !self.is_flat() && self.side == side
    }
}

/// Best-effort cached account state.
///
/// May be stale; callers that need authoritative data (the flip
/// reconciler, post-flip sizing) query the venue directly instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Available capital in quote currency.
    pub available_capital: Decimal,
    /// Known positions per symbol.
    pub positions: Vec<(String, PositionView)>,
    /// When this snapshot was taken.
    pub as_of: DateTime<Utc>,
}

impl AccountSnapshot {
    /// Look up the cached position for a symbol.
    pub fn position(&self, symbol: &str) -> Option<&PositionView> {
        self.positions
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, p)| p)
    }
}
