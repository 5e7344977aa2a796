//! Trading signals and derived intents.
//!
//! A `Signal` is the raw inbound message (already authenticated and
//! message-level deduplicated upstream). An `Intent` is the single
//! unambiguous action the engine derived from it. The reduce-only
//! flag is a function of the intent, not a free field, so the
//! open/close coupling cannot drift.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Signal action field. Mirrors `OrderSide` but kept separate so the
/// wire type and the execution type can evolve independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
}

impl SignalAction {
    /// The order side this action corresponds to.
    pub fn side(&self) -> OrderSide {
        match self {
            Self::Buy => OrderSide::Buy,
            Self::Sell => OrderSide::Sell,
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Market position side: long, short, or flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
    Flat,
}

impl PositionSide {
    /// Returns the mathematical opposite. Flat has no opposite.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
            Self::Flat => Self::Flat,
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, Self::Flat)
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
            Self::Flat => write!(f, "flat"),
        }
    }
}

/// Raw inbound trading signal.
///
/// `id` carries the semantic label of the strategy event (e.g.
/// "open_long"); `target_position`/`previous_position` describe the
/// market-position transition the strategy believes it made. The two
/// encodings are checked against each other during intent derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// Semantic label of the strategy event.
    pub id: String,
    /// Buy or sell.
    pub action: SignalAction,
    /// Market position after the event, per the strategy.
    #[serde(rename = "targetPosition")]
    pub target_position: PositionSide,
    /// Market position before the event, per the strategy.
    #[serde(rename = "previousPosition")]
    pub previous_position: PositionSide,
}

/// The unambiguous trading action derived from a signal.
///
/// Invariant: opens are never reduce-only, closes always are. Both
/// properties are derived from the variant so callers cannot produce
/// an inconsistent pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    OpenLong,
    OpenShort,
    CloseLong,
    CloseShort,
}

impl Intent {
    /// The order side that executes this intent.
    pub fn side(&self) -> OrderSide {
        match self {
            Self::OpenLong | Self::CloseShort => OrderSide::Buy,
            Self::OpenShort | Self::CloseLong => OrderSide::Sell,
        }
    }

    /// Whether the executing order must be reduce-only.
    pub fn is_reduce_only(&self) -> bool {
        matches!(self, Self::CloseLong | Self::CloseShort)
    }

    /// Whether this intent opens a new position.
    pub fn is_open(&self) -> bool {
        !self.is_reduce_only()
    }

    /// The position side this intent establishes (opens) or removes
    /// (closes).
    pub fn target_side(&self) -> PositionSide {
        match self {
            Self::OpenLong | Self::CloseLong => PositionSide::Long,
            Self::OpenShort | Self::CloseShort => PositionSide::Short,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenLong => write!(f, "open_long"),
            Self::OpenShort => write!(f, "open_short"),
            Self::CloseLong => write!(f, "close_long"),
            Self::CloseShort => write!(f, "close_short"),
        }
    }
}
