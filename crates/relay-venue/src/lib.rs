//! Venue capability interface for the relay execution engine.
//!
//! The engine treats every venue as an implementation of one narrow
//! trait with per-venue quirk descriptors, not as separate code
//! paths:
//!
//! - [`VenueClient`]: dyn-compatible async capability interface
//!   (place/cancel orders, positions, balance, leverage)
//! - [`VenueProfile`]: unit conventions and close semantics per venue
//! - [`classify`]: table-driven rejection classification
//! - [`SpecCache`]: cached symbol trading rules
//! - [`MockVenue`]: scripted recording client for tests

pub mod classify;
pub mod client;
pub mod error;
pub mod mock;
pub mod profile;
pub mod spec_cache;
pub mod types;

pub use classify::{classify, ErrorKind};
pub use client::{BoxFuture, DynVenueClient, VenueClient};
pub use error::{VenueError, VenueResult};
pub use mock::{MockVenue, VenueCall};
pub use profile::VenueProfile;
pub use spec_cache::SpecCache;
pub use types::{Balance, HedgeSide, OpenOrder, OrderAck, OrderKind, OrderRequest};
