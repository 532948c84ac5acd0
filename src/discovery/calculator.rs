//! Price & Liquidity Calculator
//!
//! Derives per-pair prices from simulated trade amounts. Every raw amount is
//! scaled to 18 decimals first, then:
//!
//!   effectivePrice      = effPriceIn / effPriceOut
//!   spotPrice           = sqrt( (aToBIn / aToBOut) / (aToBOut / bToAOut) )
//!   priceRatio          = min(spotPrice / effectivePrice, cap)
//!
//! A ratio at or above the cap counts as clamped and is reported.
//!   normalizedLiquidity = 1 / (1 - priceRatio)
//!
//! The spot price is the geometric mean of the forward and round-trip implied
//! prices, which cancels directional fees and slippage of a single quote.
//! Any zero or unrepresentable intermediate yields a zero result; this module
//! never fails.

use super::diagnostics::{ClampEvent, DiscoveryObserver};
use crate::fixed_point::{div_wad, pow_wad, scale_to_wad, HALF_WAD, WAD};
use crate::types::TokenPairQuote;
use alloy::primitives::U256;

/// 0.999999 in WAD
pub const DEFAULT_PRICE_RATIO_CAP: U256 = U256::from_limbs([999_999_000_000_000_000, 0, 0, 0]);

pub struct PriceCalculator {
    price_ratio_cap: U256,
}

impl Default for PriceCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_RATIO_CAP)
    }
}

impl PriceCalculator {
    /// `price_ratio_cap` must be below 1.0 (WAD); the config layer enforces it
    pub fn new(price_ratio_cap: U256) -> Self {
        Self { price_ratio_cap }
    }

    pub fn price_ratio_cap(&self) -> U256 {
        self.price_ratio_cap
    }

    /// Price of tokenB in tokenA for the effective-price notional
    pub fn effective_price(quote: &TokenPairQuote) -> U256 {
        let c = &quote.candidate;
        if quote.effective_price_amount_out.is_zero() {
            return U256::ZERO;
        }
        let amount_in = scale_to_wad(quote.effective_price_amount_in, c.token_a.decimals);
        let amount_out = scale_to_wad(quote.effective_price_amount_out, c.token_b.decimals);
        match (amount_in, amount_out) {
            (Some(i), Some(o)) => div_wad(i, o).unwrap_or(U256::ZERO),
            _ => U256::ZERO,
        }
    }

    /// Direction-symmetric spot price from the forward and round-trip legs
    pub fn spot_price(quote: &TokenPairQuote) -> U256 {
        let c = &quote.candidate;
        let scaled = (
            scale_to_wad(quote.a_to_b_amount_in, c.token_a.decimals),
            scale_to_wad(quote.a_to_b_amount_out, c.token_b.decimals),
            scale_to_wad(quote.b_to_a_amount_out, c.token_a.decimals),
        );
        let (a_in, a_out, b_out) = match scaled {
            (Some(a_in), Some(a_out), Some(b_out)) => (a_in, a_out, b_out),
            _ => return U256::ZERO,
        };
        if a_in.is_zero() || a_out.is_zero() || b_out.is_zero() {
            return U256::ZERO;
        }

        let spot = div_wad(a_in, a_out)
            .zip(div_wad(a_out, b_out))
            .and_then(|(price_a_to_b, price_b_to_a)| div_wad(price_a_to_b, price_b_to_a))
            .and_then(|ratio| pow_wad(ratio, HALF_WAD));

        spot.unwrap_or(U256::ZERO)
    }

    /// Unclamped spotPrice / effectivePrice
    pub fn price_ratio(spot_price: U256, effective_price: U256) -> U256 {
        div_wad(spot_price, effective_price).unwrap_or(U256::ZERO)
    }

    /// 1 / (1 - ratio) with the ratio capped below 1.0.
    /// Returns the liquidity and whether the ratio reached the cap.
    pub fn normalized_liquidity(&self, price_ratio: U256) -> (U256, bool) {
        if price_ratio.is_zero() {
            return (U256::ZERO, false);
        }
        let clamped = price_ratio >= self.price_ratio_cap;
        let ratio = if clamped { self.price_ratio_cap } else { price_ratio };

        let liquidity = div_wad(WAD, WAD - ratio).unwrap_or(U256::ZERO);
        (liquidity, clamped)
    }

    /// Fill the derived fields of a quote whose waves have resolved.
    /// Returns true when the price ratio was clamped.
    pub fn finalize(&self, quote: &mut TokenPairQuote, observer: &dyn DiscoveryObserver) -> bool {
        quote.effective_price = Self::effective_price(quote);
        quote.spot_price = Self::spot_price(quote);

        let price_ratio = Self::price_ratio(quote.spot_price, quote.effective_price);
        let (liquidity, clamped) = self.normalized_liquidity(price_ratio);
        quote.normalized_liquidity = liquidity;

        if clamped {
            observer.on_price_ratio_clamped(&ClampEvent {
                pool_id: quote.candidate.pool_id.clone(),
                token_a: quote.candidate.token_a.address,
                token_b: quote.candidate.token_b.address,
                price_ratio,
                clamped_to: self.price_ratio_cap,
                spot_price: quote.spot_price,
                effective_price: quote.effective_price,
            });
        }
        clamped
    }
}
