//! Precision-safe decimal types for trading.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, avoiding
//! floating-point rounding errors critical in financial calculations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with quantities in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Offset this price by a signed percentage.
    ///
    /// Used by conditional close-order triggers bracketing mark price.
    #[inline]
    pub fn offset_pct(&self, pct: Decimal) -> Self {
        Self(self.0 + self.0 * pct / Decimal::from(100))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

/// Order or position quantity in underlying-asset units.
///
/// Venue-specific contract counts are a presentation concern of the
/// order normalizer; everything upstream works in `Quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(pub Decimal);

impl Quantity {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Absolute value. Venue position feeds report shorts as negative.
    #[inline]
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Floor to a step increment (lot size).
    ///
    /// Returns self unchanged when the step is zero.
    #[inline]
    pub fn floor_to_step(&self, step: Quantity) -> Self {
        if step.is_zero() {
            return *self;
        }
        Self((self.0 / step.0).floor() * step.0)
    }

    /// Ceil to a step increment (lot size).
    #[inline]
    pub fn ceil_to_step(&self, step: Quantity) -> Self {
        if step.is_zero() {
            return *self;
        }
        Self((self.0 / step.0).ceil() * step.0)
    }

    /// Notional value at a given price: quantity * price.
    #[inline]
    pub fn notional(&self, price: Price) -> Decimal {
        self.0 * price.inner()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Quantity {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Quantity {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Quantity {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Quantity {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_floor_to_step() {
        let qty = Quantity::new(dec!(0.0157));
        assert_eq!(qty.floor_to_step(Quantity::new(dec!(0.001))).inner(), dec!(0.015));
        assert_eq!(qty.floor_to_step(Quantity::ZERO).inner(), dec!(0.0157));
    }

    #[test]
    fn test_ceil_to_step() {
        let qty = Quantity::new(dec!(0.0151));
        assert_eq!(qty.ceil_to_step(Quantity::new(dec!(0.001))).inner(), dec!(0.016));
    }

    #[test]
    fn test_notional() {
        let qty = Quantity::new(dec!(0.01));
        assert_eq!(qty.notional(Price::new(dec!(50000))), dec!(500.00));
    }

    #[test]
    fn test_price_offset_pct() {
        let price = Price::new(dec!(100));
        assert_eq!(price.offset_pct(dec!(2)).inner(), dec!(102));
        assert_eq!(price.offset_pct(dec!(-2)).inner(), dec!(98));
    }

    #[test]
    fn test_abs() {
        assert_eq!(Quantity::new(dec!(-0.5)).abs().inner(), dec!(0.5));
        assert_eq!(Quantity::new(dec!(0.5)).abs().inner(), dec!(0.5));
    }

    #[test]
    fn test_quantity_arithmetic() {
        let a = Quantity::new(dec!(1.5));
        let b = Quantity::new(dec!(0.5));
        assert_eq!((a - b).inner(), dec!(1.0));
        assert_eq!((a + b).inner(), dec!(2.0));
        assert_eq!((a * dec!(2)).inner(), dec!(3.0));
        assert_eq!((a / dec!(3)).inner(), dec!(0.5));
    }
}
