//! Risk-based order sizing.
//!
//! Base quantity = capital base x risk% x leverage / price, where the
//! capital base comes from one of four policies evaluated in strict
//! precedence order (fixed+reserved, fixed, reserved, plain
//! available). Capital-policy violations are terminal and
//! user-correctable; degenerate results are clamped to a small floor
//! instead of rejected so a legitimate small account still trades.

use rust_decimal::Decimal;
use tracing::warn;

use relay_core::{AccountConfig, Price, Quantity};

use crate::config::SizerConfig;

/// Terminal sizing rejections (configuration gate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizingReject {
    /// available - reserved < fixed_capital.
    FixedExceedsFree { available: Decimal, reserved: Decimal, fixed: Decimal },
    /// fixed_capital > available.
    FixedExceedsAvailable { available: Decimal, fixed: Decimal },
    /// available - reserved <= 0.
    ReservedExhaustsAvailable { available: Decimal, reserved: Decimal },
    /// Price missing or zero; nothing sensible can be sized.
    NoPrice,
}

impl std::fmt::Display for SizingReject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FixedExceedsFree { available, reserved, fixed } => write!(
                f,
                "fixed capital {fixed} exceeds free capital ({available} available - {reserved} reserved)"
            ),
            Self::FixedExceedsAvailable { available, fixed } => {
                write!(f, "fixed capital {fixed} exceeds available {available}")
            }
            Self::ReservedExhaustsAvailable { available, reserved } => write!(
                f,
                "reserved capital {reserved} leaves nothing of available {available}"
            ),
            Self::NoPrice => write!(f, "no usable price for sizing"),
        }
    }
}

/// Computes base order quantities from account risk settings.
#[derive(Debug, Clone, Default)]
pub struct RiskSizer {
    config: SizerConfig,
}

impl RiskSizer {
    pub fn new(config: SizerConfig) -> Self {
        Self { config }
    }

    /// Compute the base quantity in underlying units.
    ///
    /// `same_direction_position` flags that the account already holds
    /// a position in the direction of the new intent; the result is
    /// then damped to treat the entry as pyramiding.
    pub fn base_quantity(
        &self,
        available: Decimal,
        account: &AccountConfig,
        price: Price,
        same_direction_position: bool,
    ) -> Result<Quantity, SizingReject> {
        if !price.is_positive() {
            return Err(SizingReject::NoPrice);
        }

        let reserved = account.reserved_capital;
        let fixed = account.fixed_capital;
        let has_reserved = reserved > Decimal::ZERO;
        let has_fixed = fixed > Decimal::ZERO;

        let capital_base = if has_fixed && has_reserved {
            if available - reserved < fixed {
                return Err(SizingReject::FixedExceedsFree {
                    available,
                    reserved,
                    fixed,
                });
            }
            fixed
        } else if has_fixed {
            if fixed > available {
                return Err(SizingReject::FixedExceedsAvailable { available, fixed });
            }
            fixed
        } else if has_reserved {
            let free = available - reserved;
            if free <= Decimal::ZERO {
                return Err(SizingReject::ReservedExhaustsAvailable {
                    available,
                    reserved,
                });
            }
            free
        } else {
            available
        };

        let risk = Decimal::from(account.risk_pct) / Decimal::from(100);
        let leverage = Decimal::from(account.leverage);
        let mut quantity = capital_base * risk * leverage / price.inner();

        if same_direction_position {
            quantity *= self.config.damping;
        }

        if quantity <= Decimal::ZERO {
            warn!(
                account = %account.account_id,
                computed = %quantity,
                floor = %self.config.min_quantity_floor,
                "Degenerate size clamped to safety floor"
            );
            quantity = self.config.min_quantity_floor;
        }

        Ok(Quantity::new(quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{CredentialHandle, MarginMode, VenueId};
    use rust_decimal_macros::dec;

    fn account(risk_pct: u32, leverage: u32) -> AccountConfig {
        AccountConfig {
            account_id: "acct-1".to_string(),
            venue: VenueId::Binance,
            symbol: "BTCUSDT".to_string(),
            leverage,
            risk_pct,
            margin_mode: MarginMode::Cross,
            reserved_capital: Decimal::ZERO,
            fixed_capital: Decimal::ZERO,
            credential: CredentialHandle::new("cred-1"),
            subscription_expires_at: None,
        }
    }

    fn sizer() -> RiskSizer {
        RiskSizer::new(SizerConfig::default())
    }

    #[test]
    fn test_plain_available_sizing() {
        // 1000 x 10% x 5 / 50000 = 0.01
        let qty = sizer()
            .base_quantity(dec!(1000), &account(10, 5), Price::new(dec!(50000)), false)
            .unwrap();
        assert_eq!(qty.inner(), dec!(0.01));
    }

    #[test]
    fn test_fixed_capital_sizing() {
        let mut acct = account(10, 10);
        acct.fixed_capital = dec!(500);
        // 500 x 10% x 10 / 50000 = 0.01
        let qty = sizer()
            .base_quantity(dec!(2000), &acct, Price::new(dec!(50000)), false)
            .unwrap();
        assert_eq!(qty.inner(), dec!(0.01));
    }

    #[test]
    fn test_fixed_exceeds_available_rejected() {
        let mut acct = account(10, 10);
        acct.fixed_capital = dec!(5000);
        let result = sizer().base_quantity(dec!(1000), &acct, Price::new(dec!(50000)), false);
        assert!(matches!(result, Err(SizingReject::FixedExceedsAvailable { .. })));
    }

    #[test]
    fn test_fixed_plus_reserved_gate() {
        let mut acct = account(10, 10);
        acct.fixed_capital = dec!(500);
        acct.reserved_capital = dec!(600);
        // available - reserved = 400 < 500 fixed -> reject
        let result = sizer().base_quantity(dec!(1000), &acct, Price::new(dec!(50000)), false);
        assert!(matches!(result, Err(SizingReject::FixedExceedsFree { .. })));

        // 1100 - 600 = 500 >= 500 fixed -> sized from fixed
        let qty = sizer()
            .base_quantity(dec!(1100), &acct, Price::new(dec!(50000)), false)
            .unwrap();
        assert_eq!(qty.inner(), dec!(0.01));
    }

    #[test]
    fn test_reserved_capital_sizing() {
        let mut acct = account(10, 5);
        acct.reserved_capital = dec!(400);
        // (1400 - 400) x 10% x 5 / 50000 = 0.01
        let qty = sizer()
            .base_quantity(dec!(1400), &acct, Price::new(dec!(50000)), false)
            .unwrap();
        assert_eq!(qty.inner(), dec!(0.01));
    }

    #[test]
    fn test_reserved_exhausts_available_rejected() {
        let mut acct = account(10, 5);
        acct.reserved_capital = dec!(1000);
        let result = sizer().base_quantity(dec!(1000), &acct, Price::new(dec!(50000)), false);
        assert!(matches!(
            result,
            Err(SizingReject::ReservedExhaustsAvailable { .. })
        ));
    }

    #[test]
    fn test_pyramiding_damping() {
        let qty = sizer()
            .base_quantity(dec!(1000), &account(10, 5), Price::new(dec!(50000)), true)
            .unwrap();
        // Damped by 0.5: 0.01 -> 0.005
        assert_eq!(qty.inner(), dec!(0.005));
    }

    #[test]
    fn test_zero_available_clamped_to_floor() {
        let qty = sizer()
            .base_quantity(dec!(0), &account(10, 5), Price::new(dec!(50000)), false)
            .unwrap();
        assert_eq!(qty.inner(), dec!(0.001));
    }

    #[test]
    fn test_zero_price_rejected() {
        let result = sizer().base_quantity(dec!(1000), &account(10, 5), Price::ZERO, false);
        assert_eq!(result, Err(SizingReject::NoPrice));
    }
}
