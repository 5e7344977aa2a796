//! Venue client trait for order execution.
//!
//! Provides a trait-based abstraction over venue REST/WS transports.
//! This allows for:
//! - Dependency injection for testing
//! - Separation of execution logic from transport
//! - New venues implementing the same capability interface

use std::pin::Pin;
use std::sync::Arc;

use relay_core::{MarginMode, PositionView, Price, SymbolSpec, VenueId};

use crate::error::VenueResult;
use crate::types::{Balance, OpenOrder, OrderAck, OrderRequest};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Capability interface one venue account exposes to the engine.
///
/// One instance is bound to one account's credentials. Every method
/// is a bounded-timeout network round trip; implementations must not
/// block indefinitely.
pub trait VenueClient: Send + Sync {
    /// Which venue this client talks to.
    fn venue(&self) -> VenueId;

    /// Trading rules for a symbol.
    fn symbol_spec(&self, symbol: &str) -> BoxFuture<'_, VenueResult<SymbolSpec>>;

    /// Authoritative live position for a symbol.
    fn fetch_position(&self, symbol: &str) -> BoxFuture<'_, VenueResult<PositionView>>;

    /// Available balance in quote currency.
    fn fetch_balance(&self) -> BoxFuture<'_, VenueResult<Balance>>;

    /// Current mark price for a symbol.
    fn fetch_mark_price(&self, symbol: &str) -> BoxFuture<'_, VenueResult<Price>>;

    /// All resting open orders for a symbol.
    fn fetch_open_orders(&self, symbol: &str) -> BoxFuture<'_, VenueResult<Vec<OpenOrder>>>;

    /// Cancel every resting order for a symbol.
    fn cancel_all_orders(&self, symbol: &str) -> BoxFuture<'_, VenueResult<()>>;

    /// Cancel one order by id.
    fn cancel_order(&self, symbol: &str, order_id: &str) -> BoxFuture<'_, VenueResult<()>>;

    /// Set position leverage. Venues reject no-op changes; callers
    /// treat that rejection as success.
    fn set_leverage(&self, symbol: &str, leverage: u32) -> BoxFuture<'_, VenueResult<()>>;

    /// Set cross/isolated margin mode.
    fn set_margin_mode(&self, symbol: &str, mode: MarginMode) -> BoxFuture<'_, VenueResult<()>>;

    /// Place a normalized order.
    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, VenueResult<OrderAck>>;
}

/// Arc wrapper for VenueClient trait objects.
pub type DynVenueClient = Arc<dyn VenueClient>;
