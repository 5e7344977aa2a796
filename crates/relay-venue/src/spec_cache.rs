//! Symbol specification cache.
//!
//! Symbol rules change rarely; the cache avoids a metadata round trip
//! per execution. Entries past `max_age` are refetched through the
//! owning client on next access.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

use relay_core::{SymbolSpec, VenueId};

use crate::client::VenueClient;
use crate::error::VenueResult;

/// Cache entry with fetch timestamp.
#[derive(Debug, Clone)]
struct SpecEntry {
    spec: SymbolSpec,
    fetched_at: DateTime<Utc>,
}

/// Cached symbol specs keyed by (venue, symbol).
pub struct SpecCache {
    specs: DashMap<(VenueId, String), SpecEntry>,
    max_age: Duration,
}

impl SpecCache {
    /// Create a cache with the given entry lifetime in seconds.
    pub fn new(max_age_secs: i64) -> Self {
        Self {
            specs: DashMap::new(),
            max_age: Duration::seconds(max_age_secs),
        }
    }

    /// Get the spec for a symbol, fetching through the client when
    /// missing or stale.
    pub async fn get(&self, client: &dyn VenueClient, symbol: &str) -> VenueResult<SymbolSpec> {
        let key = (client.venue(), symbol.to_string());
        if let Some(entry) = self.specs.get(&key) {
            if Utc::now() - entry.fetched_at < self.max_age {
                return Ok(entry.spec.clone());
            }
        }

        debug!(venue = %key.0, %symbol, "Fetching symbol spec");
        let spec = client.symbol_spec(symbol).await?;
        self.specs.insert(
            key,
            SpecEntry {
                spec: spec.clone(),
                fetched_at: Utc::now(),
            },
        );
        Ok(spec)
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.specs.clear();
    }
}

impl Default for SpecCache {
    fn default() -> Self {
        // Symbol filters change on venue maintenance windows; an hour
        // keeps us within one trading session of any change.
        Self::new(3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockVenue;
    use relay_core::Quantity;
    use rust_decimal_macros::dec;

    fn spec() -> SymbolSpec {
        SymbolSpec::unit_denominated(
            "BTCUSDT",
            Quantity::new(dec!(0.001)),
            Quantity::new(dec!(0.001)),
            dec!(5),
        )
    }

    #[tokio::test]
    async fn test_cache_fetches_once() {
        let venue = MockVenue::new(VenueId::Binance);
        venue.set_symbol_spec(spec());
        let cache = SpecCache::default();

        let first = cache.get(&venue, "BTCUSDT").await.unwrap();
        let second = cache.get(&venue, "BTCUSDT").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(venue.call_count("symbol_spec"), 1);
    }

    #[tokio::test]
    async fn test_zero_age_cache_refetches() {
        let venue = MockVenue::new(VenueId::Binance);
        venue.set_symbol_spec(spec());
        let cache = SpecCache::new(0);

        cache.get(&venue, "BTCUSDT").await.unwrap();
        cache.get(&venue, "BTCUSDT").await.unwrap();
        assert_eq!(venue.call_count("symbol_spec"), 2);
    }
}
