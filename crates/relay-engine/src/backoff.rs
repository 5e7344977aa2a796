//! Bounded retry-with-interval primitive.
//!
//! The flip reconciler, the retry handler, and the lease lock all
//! poll an external condition a bounded number of times with a fixed
//! wait in between. One primitive, parameterized by attempts and
//! interval, keeps those loops uniform and provably bounded.

use std::future::Future;
use std::time::Duration;

/// Bounded retry loop configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Wait between attempts.
    pub interval: Duration,
}

impl Backoff {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Run `attempt` up to `max_attempts` times, sleeping `interval`
    /// between tries, until it returns `Some(T)`.
    ///
    /// Returns `None` when the budget is exhausted. The interval is
    /// not slept after the final attempt.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Option<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        for n in 0..self.max_attempts {
            if let Some(value) = attempt(n).await {
                return Some(value);
            }
            if n + 1 < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        None
    }
}
