//! Discovery Diagnostics
//!
//! Structured events the engine reports to its caller instead of writing to
//! a global error tracker. The default observer forwards them to `tracing`.

use super::requests::QuoteKey;
use crate::fixed_point::format_wad;
use alloy::primitives::{Address, U256};
use tracing::{debug, warn};

/// A price ratio at or above the cap was clamped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClampEvent {
    pub pool_id: String,
    pub token_a: Address,
    pub token_b: Address,
    /// spotPrice / effectivePrice before clamping (WAD)
    pub price_ratio: U256,
    /// Value used instead (WAD)
    pub clamped_to: U256,
    pub spot_price: U256,
    pub effective_price: U256,
}

pub trait DiscoveryObserver: Send + Sync {
    fn on_price_ratio_clamped(&self, event: &ClampEvent);

    fn on_leg_failed(&self, _key: &QuoteKey) {}
}

/// Logs diagnostics through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DiscoveryObserver for TracingObserver {
    fn on_price_ratio_clamped(&self, event: &ClampEvent) {
        warn!(
            pool_id = %event.pool_id,
            token_a = %event.token_a,
            token_b = %event.token_b,
            spot_price = %format_wad(event.spot_price),
            effective_price = %format_wad(event.effective_price),
            "Price ratio {} clamped to {} (favorable price impact)",
            format_wad(event.price_ratio),
            format_wad(event.clamped_to),
        );
    }

    fn on_leg_failed(&self, key: &QuoteKey) {
        debug!("Simulation failed for {}", key);
    }
}

/// Discards diagnostics
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DiscoveryObserver for NoopObserver {
    fn on_price_ratio_clamped(&self, _event: &ClampEvent) {}
}
