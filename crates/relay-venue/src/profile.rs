//! Per-venue behavior profiles.
//!
//! The two supported venue families disagree on order-size units,
//! hedge-mode tagging, and whether one reduce-only market order
//! reliably zeroes a position. Profiles capture those quirks as data
//! so the engine has a single code path.

use rust_decimal::Decimal;
use relay_core::VenueId;

/// Static behavior descriptor for a venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueProfile {
    /// Which venue this profile describes.
    pub venue: VenueId,
    /// Whether order size is submitted in contracts.
    pub contract_denominated: bool,
    /// Whether orders must carry a hedge-mode position-side tag.
    pub supports_hedge_mode: bool,
    /// Whether a single reduce-only market order reliably closes a
    /// position. When false the flip reconciler re-queries and
    /// re-issues until flat.
    pub single_shot_close: bool,
    /// Whether the venue supports a close-on-trigger flag that closes
    /// regardless of resting orders.
    pub supports_close_on_trigger: bool,
    /// Trigger offset for conditional close fallback orders, in
    /// percent from mark price.
    pub trigger_offset_pct: Decimal,
}

impl VenueProfile {
    /// Profile for a venue.
    pub fn for_venue(venue: VenueId) -> Self {
        match venue {
            VenueId::Binance => Self {
                venue,
                contract_denominated: false,
                supports_hedge_mode: true,
                single_shot_close: true,
                supports_close_on_trigger: false,
                trigger_offset_pct: Decimal::TWO,
            },
            VenueId::Bybit => Self {
                venue,
                contract_denominated: true,
                supports_hedge_mode: false,
                single_shot_close: false,
                supports_close_on_trigger: true,
                trigger_offset_pct: Decimal::TWO,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_diverge_on_units() {
        let binance = VenueProfile::for_venue(VenueId::Binance);
        let bybit = VenueProfile::for_venue(VenueId::Bybit);
        assert!(!binance.contract_denominated);
        assert!(bybit.contract_denominated);
    }

    #[test]
    fn test_close_semantics() {
        let binance = VenueProfile::for_venue(VenueId::Binance);
        let bybit = VenueProfile::for_venue(VenueId::Bybit);
        assert!(binance.single_shot_close);
        assert!(!bybit.single_shot_close);
        assert!(bybit.supports_close_on_trigger);
    }
}
