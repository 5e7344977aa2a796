//! Position flip reconciliation.
//!
//! An opening intent against an opposing live position must close
//! that position first. Venues disagree on whether one reduce-only
//! market order reliably zeroes a position (lot truncation,
//! hedge-mode ambiguity), so closing is an iterate-then-fallback
//! ladder: re-query and re-issue under a bounded budget, then bracket
//! the mark price with venue-native conditional close orders and
//! cancel the survivor.

use std::time::Duration;

use tracing::{debug, info, warn};

use relay_core::{
    ClientOrderId, Intent, MarginMode, OrderSide, PositionSide, Quantity, SymbolSpec,
};
use relay_venue::{HedgeSide, OrderKind, OrderRequest, VenueClient, VenueProfile};

use crate::backoff::Backoff;
use crate::config::FlipConfig;
use crate::normalize::{normalize_order, NormalizeReject};

/// Terminal state of one reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum FlipOutcome {
    /// No opposing position; nothing was done.
    NotNeeded,
    /// Opposing position fully closed.
    Flat,
    /// Dust remains after the full ladder; callers proceed but the
    /// resting trigger may still close it asynchronously.
    Residual(Quantity),
    /// A venue call failed; the pipeline must not open.
    Failed(String),
}

impl FlipOutcome {
    /// Whether the pipeline may continue to sizing.
    pub fn may_proceed(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Drives opposing positions flat before an open.
#[derive(Debug, Clone)]
pub struct FlipReconciler {
    config: FlipConfig,
}

impl FlipReconciler {
    pub fn new(config: FlipConfig) -> Self {
        Self { config }
    }

    /// Ensure no position opposes `intent` on `symbol`.
    ///
    /// Only meaningful for opening intents; closing intents never
    /// enter reconciliation.
    pub async fn ensure_no_opposition(
        &self,
        client: &dyn VenueClient,
        symbol: &str,
        intent: Intent,
        spec: &SymbolSpec,
        profile: &VenueProfile,
        margin_mode: MarginMode,
    ) -> FlipOutcome {
        let position = match client.fetch_position(symbol).await {
            Ok(position) => position,
            Err(error) => return FlipOutcome::Failed(format!("position query failed: {error}")),
        };

        if !position.opposes(intent.target_side()) {
            return FlipOutcome::NotNeeded;
        }

        info!(
            %symbol,
            opposing = %position.side,
            quantity = %position.quantity,
            intent = %intent,
            "Opposing position found, closing before open"
        );

        // Resting orders can block reduce-only closes; clear them.
        if let Err(error) = client.cancel_all_orders(symbol).await {
            return FlipOutcome::Failed(format!("cancel before close failed: {error}"));
        }

        let closing_side = closing_side_for(position.side);
        let backoff = Backoff::new(
            self.config.max_close_iterations,
            Duration::from_millis(self.config.poll_interval_ms),
        );

        // Iterate: close the remaining quantity, re-query, repeat.
        // Some(...) ends the loop: flat, dust too small to close, or
        // venue failure.
        let closed = backoff
            .run(|iteration| async move {
                let remaining = match client.fetch_position(symbol).await {
                    Ok(p) if p.is_flat() => return Some(CloseLoop::Flat),
                    Ok(p) => p.quantity,
                    Err(error) => {
                        return Some(CloseLoop::Failed(format!(
                            "position re-query failed: {error}"
                        )))
                    }
                };

                debug!(%symbol, iteration, %remaining, "Issuing reduce-only close");

                let request = match normalize_order(
                    remaining,
                    relay_core::Price::ZERO,
                    closing_side,
                    true,
                    spec,
                    profile,
                    margin_mode,
                ) {
                    Ok(request) => request,
                    Err(
                        NormalizeReject::BelowMinimumClose { .. }
                        | NormalizeReject::BelowNotionalClose { .. }
                        | NormalizeReject::ZeroQuantity,
                    ) => {
                        // Dust below the venue minimum; the market
                        // order path cannot clear it.
                        return Some(CloseLoop::Dust(remaining));
                    }
                };

                if let Err(error) = client.place_order(request).await {
                    warn!(%symbol, iteration, %error, "Reduce-only close rejected");
                }
                None
            })
            .await;

        match closed {
            Some(CloseLoop::Flat) => {
                info!(%symbol, "Opposing position closed");
                return FlipOutcome::Flat;
            }
            Some(CloseLoop::Failed(reason)) => return FlipOutcome::Failed(reason),
            Some(CloseLoop::Dust(_)) | None => {}
        }

        // Budget exhausted or dust: final check, then conditional
        // fallback.
        let remaining = match client.fetch_position(symbol).await {
            Ok(p) if p.is_flat() => return FlipOutcome::Flat,
            Ok(p) => p.quantity,
            Err(error) => {
                return FlipOutcome::Failed(format!("position re-query failed: {error}"))
            }
        };

        warn!(
            %symbol,
            %remaining,
            "Residual after close iterations, placing conditional fallback"
        );
        relay_telemetry::Metrics::flip_fallback(&client.venue().to_string());
        self.trigger_fallback(client, symbol, closing_side, remaining, spec, profile, margin_mode)
            .await
    }

    /// Bracket mark price with conditional close-at-any-price orders,
    /// wait briefly, cancel whichever did not trigger.
    #[allow(clippy::too_many_arguments)]
    async fn trigger_fallback(
        &self,
        client: &dyn VenueClient,
        symbol: &str,
        closing_side: OrderSide,
        remaining: Quantity,
        spec: &SymbolSpec,
        profile: &VenueProfile,
        margin_mode: MarginMode,
    ) -> FlipOutcome {
        let mark = match client.fetch_mark_price(symbol).await {
            Ok(mark) => mark,
            Err(error) => return FlipOutcome::Failed(format!("mark price query failed: {error}")),
        };

        let quantity = spec.to_order_units(remaining).ceil_to_step(spec.lot_step);
        let position_side = profile
            .supports_hedge_mode
            .then(|| HedgeSide::for_order(closing_side, true));

        for offset in [profile.trigger_offset_pct, -profile.trigger_offset_pct] {
            let request = OrderRequest {
                symbol: symbol.to_string(),
                side: closing_side,
                quantity,
                reduce_only: true,
                kind: OrderKind::TriggerClose {
                    trigger_price: mark.offset_pct(offset),
                },
                margin_mode,
                close_on_trigger: profile.supports_close_on_trigger,
                position_side,
                client_order_id: ClientOrderId::new(),
            };
            if let Err(error) = client.place_order(request).await {
                warn!(%symbol, %offset, %error, "Conditional close placement rejected");
            }
        }

        tokio::time::sleep(Duration::from_millis(self.config.trigger_wait_ms)).await;

        // Cancel whichever bracket leg did not trigger, by id. A
        // failed open-order query degrades to a blanket cancel.
        match client.fetch_open_orders(symbol).await {
            Ok(survivors) => {
                for order in survivors {
                    if let Err(error) = client.cancel_order(symbol, &order.order_id).await {
                        warn!(
                            %symbol,
                            order_id = %order.order_id,
                            %error,
                            "Cancel of surviving trigger failed"
                        );
                    }
                }
            }
            Err(error) => {
                warn!(%symbol, %error, "Open-order query failed, cancelling everything");
                if let Err(error) = client.cancel_all_orders(symbol).await {
                    warn!(%symbol, %error, "Cancel of surviving triggers failed");
                }
            }
        }

        match client.fetch_position(symbol).await {
            Ok(p) if p.is_flat() => FlipOutcome::Flat,
            Ok(p) => {
                warn!(%symbol, remaining = %p.quantity, "Residual position after fallback");
                FlipOutcome::Residual(p.quantity)
            }
            Err(error) => FlipOutcome::Failed(format!("position re-query failed: {error}")),
        }
    }
}

/// One iteration's verdict inside the close loop.
enum CloseLoop {
    Flat,
    Dust(Quantity),
    Failed(String),
}

fn closing_side_for(position_side: PositionSide) -> OrderSide {
    match position_side {
        PositionSide::Long => OrderSide::Sell,
        // Flat never reaches here; opposes() filters it out.
        PositionSide::Short | PositionSide::Flat => OrderSide::Buy,
    }
}
