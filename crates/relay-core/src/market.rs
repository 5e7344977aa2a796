//! Venue symbol specifications.
//!
//! Captures the per-symbol rules that order normalization needs: lot
//! step, minimum quantity, minimum notional, and whether the venue
//! denominates order size in contracts rather than underlying units.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Quantity;
use crate::error::{CoreError, Result};

/// Symbol trading rules from a venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSpec {
    /// Symbol in venue notation.
    pub symbol: String,
    /// Minimum quantity increment.
    pub lot_step: Quantity,
    /// Minimum order quantity.
    pub min_qty: Quantity,
    /// Minimum order notional in quote currency. Zero disables.
    pub min_notional: Decimal,
    /// Underlying units per contract. One for unit-denominated venues.
    pub contract_size: Decimal,
    /// Whether order size is submitted in contracts.
    pub contract_denominated: bool,
}

impl SymbolSpec {
    /// Spec for a venue that sizes orders in underlying units.
    pub fn unit_denominated(
        symbol: impl Into<String>,
        lot_step: Quantity,
        min_qty: Quantity,
        min_notional: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            lot_step,
            min_qty,
            min_notional,
            contract_size: Decimal::ONE,
            contract_denominated: false,
        }
    }

    /// Spec for a venue that sizes orders in contracts.
    pub fn contract_denominated(
        symbol: impl Into<String>,
        lot_step: Quantity,
        min_qty: Quantity,
        min_notional: Decimal,
        contract_size: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            lot_step,
            min_qty,
            min_notional,
            contract_size,
            contract_denominated: true,
        }
    }

    /// Validate that conversion and rounding are well defined.
    pub fn validate(&self) -> Result<()> {
        if self.contract_size.is_sign_negative() || self.contract_size.is_zero() {
            return Err(CoreError::InvalidSymbolSpec(format!(
                "{}: contract_size {} must be positive",
                self.symbol, self.contract_size
            )));
        }
        if self.min_notional.is_sign_negative() {
            return Err(CoreError::InvalidSymbolSpec(format!(
                "{}: negative min_notional {}",
                self.symbol, self.min_notional
            )));
        }
        Ok(())
    }

    /// Convert an underlying-unit quantity to this venue's order
    /// units (contracts when contract-denominated, unchanged
    /// otherwise).
    pub fn to_order_units(&self, qty: Quantity) -> Quantity {
        if self.contract_denominated {
            Quantity::new(qty.inner() / self.contract_size)
        } else {
            qty
        }
    }

    /// Convert an order-unit quantity back to underlying units.
    pub fn to_underlying(&self, qty: Quantity) -> Quantity {
        if self.contract_denominated {
            Quantity::new(qty.inner() * self.contract_size)
        } else {
            qty
        }
    }
}
