//! Prometheus metrics and structured logging for the signal relay.
//!
//! - Counters for dispatch, placement, skip, failure, and flip
//!   fallback events
//! - Structured JSON logging with tracing

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_LOG_FILTER};
pub use metrics::Metrics;
