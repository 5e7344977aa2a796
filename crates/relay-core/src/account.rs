//! Per-account execution configuration.
//!
//! Owned by account administration outside this system; the engine
//! only reads it. `validate` enforces the ranges the sizing formulas
//! assume so bad rows fail loudly at load time, not at order time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Supported venues.
///
/// Two order-book venue families with different unit conventions and
/// minimums. A third venue adds a variant here plus a profile and
/// classifier rows in relay-venue, not a new code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueId {
    Binance,
    Bybit,
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binance => write!(f, "binance"),
            Self::Bybit => write!(f, "bybit"),
        }
    }
}

/// Margin mode for derivatives positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginMode {
    #[default]
    Cross,
    Isolated,
}

impl fmt::Display for MarginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cross => write!(f, "cross"),
            Self::Isolated => write!(f, "isolated"),
        }
    }
}

/// Opaque reference to venue API credentials.
///
/// The engine never sees key material; the venue client resolves the
/// handle internally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialHandle(pub String);

impl CredentialHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Per-account execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Unique account identifier.
    pub account_id: String,
    /// Venue this account trades on.
    pub venue: VenueId,
    /// Traded symbol (venue notation, e.g. "BTCUSDT").
    pub symbol: String,
    /// Leverage, 1..=100.
    pub leverage: u32,
    /// Risk percentage of capital per entry, 1..=100.
    pub risk_pct: u32,
    /// Cross or isolated margin.
    #[serde(default)]
    pub margin_mode: MarginMode,
    /// Capital amount excluded from sizing. Zero disables.
    #[serde(default)]
    pub reserved_capital: Decimal,
    /// Fixed capital base for sizing. Zero disables.
    #[serde(default)]
    pub fixed_capital: Decimal,
    /// Reference to the account's venue credentials.
    pub credential: CredentialHandle,
    /// Channel subscription expiry, if any.
    #[serde(default)]
    pub subscription_expires_at: Option<DateTime<Utc>>,
}

impl AccountConfig {
    /// Validate ranges the sizing formulas assume.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.leverage) {
            return Err(CoreError::InvalidAccountConfig(format!(
                "{}: leverage {} outside 1..=100",
                self.account_id, self.leverage
            )));
        }
        if !(1..=100).contains(&self.risk_pct) {
            return Err(CoreError::InvalidAccountConfig(format!(
                "{}: risk_pct {} outside 1..=100",
                self.account_id, self.risk_pct
            )));
        }
        if self.reserved_capital.is_sign_negative() {
            return Err(CoreError::InvalidAccountConfig(format!(
                "{}: negative reserved_capital {}",
                self.account_id, self.reserved_capital
            )));
        }
        if self.fixed_capital.is_sign_negative() {
            return Err(CoreError::InvalidAccountConfig(format!(
                "{}: negative fixed_capital {}",
                self.account_id, self.fixed_capital
            )));
        }
        Ok(())
    }

    /// Whether the account's channel subscription is still active.
    ///
    /// No expiry set means the subscription never lapses.
    pub fn subscription_active(&self, now: DateTime<Utc>) -> bool {
        match self.subscription_expires_at {
            Some(expires) => now < expires,
            None => true,
        }
    }
}
