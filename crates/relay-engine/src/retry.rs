//! Error-aware order placement.
//!
//! One placement attempt plus a short, error-class-specific recovery
//! ladder. Insufficient-margin rejections on opens get a bounded
//! sequence of scaled-up resubmissions (venues reject sub-minimum
//! notionals with margin-flavored errors after fee padding).
//! Reduce-only conflicts get a cancel-and-force retry. Transient
//! transport classes surface as retryable for the caller to report;
//! everything else is terminal.

use tracing::{info, warn};

use relay_core::VenueId;
use relay_venue::{classify, ErrorKind, OrderAck, OrderRequest, VenueClient, VenueProfile};

use crate::config::RetryConfig;

/// Terminal result of a placement attempt plus its recovery ladder.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceOutcome {
    /// Accepted by the venue.
    Placed(OrderAck),
    /// Failed with a class worth resubmitting later (rate limit,
    /// transport). The engine surfaces these as retryable failures.
    Retryable(String),
    /// Failed with a class no resubmission can fix.
    Rejected(String),
}

impl PlaceOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed(_))
    }
}

/// Places orders and walks the recovery ladder on rejection.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Place `request`, recovering per error class.
    pub async fn place(
        &self,
        client: &dyn VenueClient,
        profile: &VenueProfile,
        request: OrderRequest,
    ) -> PlaceOutcome {
        let venue = client.venue();
        let symbol = request.symbol.clone();

        let error = match client.place_order(request.clone()).await {
            Ok(ack) => return PlaceOutcome::Placed(ack),
            Err(error) => error,
        };

        match classify(&error, venue) {
            ErrorKind::InsufficientMargin if !request.reduce_only => {
                self.scale_up(client, venue, request, &error.to_string()).await
            }
            ErrorKind::InsufficientMargin => {
                PlaceOutcome::Rejected(format!("close rejected for margin: {error}"))
            }
            ErrorKind::CloseConflict => {
                self.force_close(client, profile, request, &symbol, &error.to_string())
                    .await
            }
            ErrorKind::RateLimited | ErrorKind::Network => {
                warn!(%symbol, %error, "Transient venue failure, surfacing as retryable");
                PlaceOutcome::Retryable(error.to_string())
            }
            ErrorKind::Terminal => PlaceOutcome::Rejected(error.to_string()),
        }
    }

    /// Resubmit an open with the quantity scaled up, a bounded number
    /// of times.
    async fn scale_up(
        &self,
        client: &dyn VenueClient,
        venue: VenueId,
        request: OrderRequest,
        first_error: &str,
    ) -> PlaceOutcome {
        let mut last_error = first_error.to_string();
        let mut scaled = request;

        for attempt in 1..=self.config.max_scale_ups {
            scaled = scaled.scaled(self.config.scale_factor);
            info!(
                symbol = %scaled.symbol,
                attempt,
                quantity = %scaled.quantity,
                "Resubmitting open with scaled quantity"
            );
            match client.place_order(scaled.clone()).await {
                Ok(ack) => return PlaceOutcome::Placed(ack),
                Err(error) => match classify(&error, venue) {
                    ErrorKind::InsufficientMargin => last_error = error.to_string(),
                    ErrorKind::RateLimited | ErrorKind::Network => {
                        warn!(
                            symbol = %scaled.symbol,
                            %error,
                            "Transient failure during scaled resubmission, surfacing as retryable"
                        );
                        return PlaceOutcome::Retryable(error.to_string());
                    }
                    _ => return PlaceOutcome::Rejected(error.to_string()),
                },
            }
        }

        PlaceOutcome::Rejected(format!(
            "open rejected after {} scaled retries: {last_error}",
            self.config.max_scale_ups
        ))
    }

    /// A close rejected by a reduce-only conflict: clear resting
    /// orders and retry once, forcing close-on-trigger where the
    /// venue supports it.
    async fn force_close(
        &self,
        client: &dyn VenueClient,
        profile: &VenueProfile,
        request: OrderRequest,
        symbol: &str,
        first_error: &str,
    ) -> PlaceOutcome {
        warn!(%symbol, error = %first_error, "Close conflicted with resting orders, cancelling and retrying");

        if let Err(error) = client.cancel_all_orders(symbol).await {
            return PlaceOutcome::Rejected(format!("cancel before forced close failed: {error}"));
        }

        let mut retry = request;
        retry.close_on_trigger = profile.supports_close_on_trigger;

        match client.place_order(retry).await {
            Ok(ack) => PlaceOutcome::Placed(ack),
            Err(error) => PlaceOutcome::Rejected(format!("forced close rejected: {error}")),
        }
    }
}
