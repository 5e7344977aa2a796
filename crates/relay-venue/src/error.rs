//! Venue error types.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum VenueError {
    /// The venue accepted the request and rejected it with a reason.
    #[error("Order rejected ({code}): {message}")]
    Rejected { code: i64, message: String },

    /// Transport-level failure before a definitive venue answer.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request exceeded its deadline.
    #[error("Request timed out")]
    Timeout,

    /// The venue throttled the request.
    #[error("Rate limited")]
    RateLimited,

    /// No spec available for the requested symbol.
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
}

pub type VenueResult<T> = Result<T, VenueError>;
