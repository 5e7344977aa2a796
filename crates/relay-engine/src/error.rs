//! Engine error types.
//!
//! These are infrastructure failures only. Venue rejections and
//! policy gates surface as `ExecutionResult` values, never as errors,
//! so one account's failure cannot abort a fan-out.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Lock unavailable for {key} after {attempts} attempts")]
    LockUnavailable { key: String, attempts: u32 },

    #[error("Lease store error: {0}")]
    LeaseStore(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] relay_core::CoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
