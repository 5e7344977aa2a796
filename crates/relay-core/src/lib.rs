//! Core domain types for the relay signal execution engine.
//!
//! This crate provides fundamental types used throughout the system:
//! - `Price`, `Quantity`: precision-safe numeric types
//! - `Signal`, `Intent`: trading signals and derived intents
//! - `AccountConfig`: per-account execution settings
//! - `PositionView`, `AccountSnapshot`: read-only position state
//! - `SymbolSpec`: venue symbol rules (lot step, minimums, contracts)
//! - `ExecutionResult`: per-account pipeline outcome

pub mod account;
pub mod decimal;
pub mod error;
pub mod execution;
pub mod market;
pub mod position;
pub mod signal;

pub use account::{AccountConfig, CredentialHandle, MarginMode, VenueId};
pub use decimal::{Price, Quantity};
pub use error::{CoreError, Result};
pub use execution::{ClientOrderId, DispatchOutcome, ExecutionResult};
pub use market::SymbolSpec;
pub use position::{AccountSnapshot, PositionView};
pub use signal::{Intent, OrderSide, PositionSide, Signal, SignalAction};
