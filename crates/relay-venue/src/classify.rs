//! Table-driven venue rejection classification.
//!
//! Venue rejections arrive as error codes plus free-form messages.
//! Classification is a static table of (venue, needle, kind) rows
//! consulted in order; supporting a new venue means adding rows, not
//! scattering new conditionals through the pipeline.

use relay_core::VenueId;

use crate::error::VenueError;

/// What a venue rejection means for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Not enough margin/notional for an opening order. Retryable
    /// with a scaled-up quantity (minimum-notional edge case).
    InsufficientMargin,
    /// A resting order blocks a reduce-only close. Retryable after
    /// cancelling open orders with a forced-close flag.
    CloseConflict,
    /// Venue throttling. Surfaced retryable to the caller.
    RateLimited,
    /// Transport-level failure. Surfaced retryable to the caller.
    Network,
    /// Anything else. Terminal.
    Terminal,
}

impl ErrorKind {
    /// Whether the caller may resubmit the signal later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Network)
    }
}

/// Venue filter for a classification row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum For {
    Any,
    Only(VenueId),
}

impl For {
    fn matches(&self, venue: VenueId) -> bool {
        match self {
            Self::Any => true,
            Self::Only(v) => *v == venue,
        }
    }
}

/// Match criterion for a classification row.
#[derive(Debug, Clone, Copy)]
enum Needle {
    Code(i64),
    Keyword(&'static str),
}

/// Classification table. First matching row wins.
///
/// Codes are the venues' published rejection codes; keywords cover
/// message-only rejections and have been kept lowercase (matching is
/// case-insensitive on the message).
const REJECTION_TABLE: &[(For, Needle, ErrorKind)] = &[
    // Binance futures
    (For::Only(VenueId::Binance), Needle::Code(-2019), ErrorKind::InsufficientMargin),
    (For::Only(VenueId::Binance), Needle::Code(-4164), ErrorKind::InsufficientMargin),
    (For::Only(VenueId::Binance), Needle::Code(-2022), ErrorKind::CloseConflict),
    (For::Only(VenueId::Binance), Needle::Code(-1003), ErrorKind::RateLimited),
    // Bybit
    (For::Only(VenueId::Bybit), Needle::Code(110007), ErrorKind::InsufficientMargin),
    (For::Only(VenueId::Bybit), Needle::Code(110017), ErrorKind::CloseConflict),
    (For::Only(VenueId::Bybit), Needle::Code(110044), ErrorKind::InsufficientMargin),
    (For::Only(VenueId::Bybit), Needle::Code(10006), ErrorKind::RateLimited),
    // Message keywords, any venue
    (For::Any, Needle::Keyword("insufficient"), ErrorKind::InsufficientMargin),
    (For::Any, Needle::Keyword("margin is insufficient"), ErrorKind::InsufficientMargin),
    (For::Any, Needle::Keyword("notional must be no smaller"), ErrorKind::InsufficientMargin),
    (For::Any, Needle::Keyword("reduceonly"), ErrorKind::CloseConflict),
    (For::Any, Needle::Keyword("reduce-only"), ErrorKind::CloseConflict),
    (For::Any, Needle::Keyword("position is zero"), ErrorKind::CloseConflict),
    (For::Any, Needle::Keyword("too many requests"), ErrorKind::RateLimited),
    (For::Any, Needle::Keyword("rate limit"), ErrorKind::RateLimited),
    (For::Any, Needle::Keyword("timeout"), ErrorKind::Network),
    (For::Any, Needle::Keyword("connection"), ErrorKind::Network),
];

/// Classify a venue error for a specific venue.
pub fn classify(error: &VenueError, venue: VenueId) -> ErrorKind {
    match error {
        VenueError::RateLimited => ErrorKind::RateLimited,
        VenueError::Transport(_) | VenueError::Timeout => ErrorKind::Network,
        VenueError::UnknownSymbol(_) => ErrorKind::Terminal,
        VenueError::Rejected { code, message } => {
            let message = message.to_lowercase();
            for (venue_filter, needle, kind) in REJECTION_TABLE {
                if !venue_filter.matches(venue) {
                    continue;
                }
                let hit = match needle {
                    Needle::Code(c) => c == code,
                    Needle::Keyword(kw) => message.contains(kw),
                };
                if hit {
                    return *kind;
                }
            }
            ErrorKind::Terminal
        }
    }
}
