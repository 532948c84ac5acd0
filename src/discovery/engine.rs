//! Token Pair Discovery Engine
//!
//! Two-stage pipeline over all pools at once:
//!
//!   candidates → sizing → wave 1 (A→B legs) → wave 2 (B→A legs) → finalize → assemble
//!
//! Each stage is its own type and only the resolved result of a stage can
//! produce the next one, so wave 2 requests cannot be built before every
//! wave-1 call (including failures) has come back.
//!
//! Calls of all pools share a wave so each wave is a single dispatch.
//! A hard dispatch failure aborts the run with no partial output.

use super::assembler;
use super::calculator::PriceCalculator;
use super::candidates;
use super::diagnostics::{DiscoveryObserver, TracingObserver};
use super::dispatcher::{BatchDispatcher, QuoteBackend};
use super::requests::{Leg, QuoteKey, QuoteRequest, QuoteRequestBuilder, QuoteSizing};
use crate::config::DiscoverySettings;
use crate::errors::DiscoveryError;
use crate::fixed_point::decimal_to_wad;
use crate::types::{PoolSnapshot, TokenPairQuote, TokenPairResult};
use alloy::primitives::U256;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Counters for one run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryStats {
    pub pools: usize,
    pub candidates: usize,
    pub valid_candidates: usize,
    pub wave_one_calls: usize,
    pub wave_two_calls: usize,
    pub failed_legs: usize,
    pub clamped_ratios: usize,
}

#[derive(Debug, Clone)]
pub struct DiscoveryOutput {
    pub pairs: IndexMap<String, Vec<TokenPairResult>>,
    pub stats: DiscoveryStats,
}

// ── Stages ───────────────────────────────────────────────────────────────────

/// Write one wave's outcomes into the quotes. Unscheduled legs stay zero.
fn apply_wave(
    quotes: &mut [TokenPairQuote],
    results: &HashMap<QuoteKey, Option<U256>>,
    legs: &[Leg],
    observer: &dyn DiscoveryObserver,
    stats: &mut DiscoveryStats,
) {
    for quote in quotes.iter_mut().filter(|q| q.is_valid()) {
        for &leg in legs {
            let key = QuoteKey::new(&quote.candidate, leg);
            let amount = match results.get(&key) {
                Some(Some(amount)) => *amount,
                Some(None) => {
                    stats.failed_legs += 1;
                    observer.on_leg_failed(&key);
                    U256::ZERO
                }
                None => U256::ZERO,
            };
            match leg {
                Leg::EffectivePrice => quote.effective_price_amount_out = amount,
                Leg::AToB => quote.a_to_b_amount_out = amount,
                Leg::BToA => quote.b_to_a_amount_out = amount,
            }
        }
    }
}

/// Quotes with input amounts filled, nothing dispatched yet
pub struct SizedQuotes {
    quotes: Vec<TokenPairQuote>,
}

impl SizedQuotes {
    pub fn new(quotes: Vec<TokenPairQuote>) -> Self {
        Self { quotes }
    }

    pub fn requests(&self, builder: &QuoteRequestBuilder) -> Vec<QuoteRequest> {
        builder.wave_one(&self.quotes)
    }

    pub fn resolve(
        mut self,
        results: &HashMap<QuoteKey, Option<U256>>,
        observer: &dyn DiscoveryObserver,
        stats: &mut DiscoveryStats,
    ) -> WaveOneResolved {
        apply_wave(
            &mut self.quotes,
            results,
            &[Leg::EffectivePrice, Leg::AToB],
            observer,
            stats,
        );
        WaveOneResolved { quotes: self.quotes }
    }
}

/// A→B outputs known
pub struct WaveOneResolved {
    quotes: Vec<TokenPairQuote>,
}

impl WaveOneResolved {
    pub fn requests(&self, builder: &QuoteRequestBuilder) -> Vec<QuoteRequest> {
        builder.wave_two(&self.quotes)
    }

    pub fn resolve(
        mut self,
        results: &HashMap<QuoteKey, Option<U256>>,
        observer: &dyn DiscoveryObserver,
        stats: &mut DiscoveryStats,
    ) -> WaveTwoResolved {
        apply_wave(&mut self.quotes, results, &[Leg::BToA], observer, stats);
        WaveTwoResolved { quotes: self.quotes }
    }
}

/// All legs known; ready for price math
pub struct WaveTwoResolved {
    quotes: Vec<TokenPairQuote>,
}

impl WaveTwoResolved {
    pub fn finalize(
        mut self,
        calculator: &PriceCalculator,
        observer: &dyn DiscoveryObserver,
        stats: &mut DiscoveryStats,
    ) -> Vec<TokenPairQuote> {
        for quote in self.quotes.iter_mut().filter(|q| q.is_valid()) {
            if calculator.finalize(quote, observer) {
                stats.clamped_ratios += 1;
            }
        }
        self.quotes
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct TokenPairDiscovery<B> {
    dispatcher: BatchDispatcher<B>,
    builder: QuoteRequestBuilder,
    calculator: PriceCalculator,
    min_pool_tvl_usd: Decimal,
    observer: Arc<dyn DiscoveryObserver>,
}

impl<B: QuoteBackend> TokenPairDiscovery<B> {
    pub fn new(backend: B, settings: &DiscoverySettings) -> Self {
        Self {
            dispatcher: BatchDispatcher::new(backend),
            builder: QuoteRequestBuilder::new(QuoteSizing::from(settings)),
            calculator: PriceCalculator::new(decimal_to_wad(settings.price_ratio_cap)),
            min_pool_tvl_usd: settings.min_pool_tvl_usd,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the default tracing observer
    pub fn with_observer(mut self, observer: Arc<dyn DiscoveryObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn backend(&self) -> &B {
        self.dispatcher.backend()
    }

    /// Compute spot price and normalized liquidity for every admissible
    /// token pair of every pool.
    pub async fn discover_token_pair_prices(
        &self,
        pools: &[PoolSnapshot],
    ) -> Result<DiscoveryOutput, DiscoveryError> {
        let started = Instant::now();
        let observer = self.observer.as_ref();
        let mut stats = DiscoveryStats {
            pools: pools.len(),
            ..Default::default()
        };

        // Sizing
        let candidates = candidates::generate_all(pools, self.min_pool_tvl_usd);
        stats.candidates = candidates.len();
        stats.valid_candidates = candidates.iter().filter(|c| c.valid).count();
        let sized = SizedQuotes::new(
            candidates
                .into_iter()
                .map(|c| self.builder.prepare(c))
                .collect(),
        );

        // Wave 1
        let requests = sized.requests(&self.builder);
        stats.wave_one_calls = requests.len();
        debug!("Wave 1: {} calls", requests.len());
        let results = self.dispatcher.execute(requests).await?;
        let wave_one = sized.resolve(&results, observer, &mut stats);

        // Wave 2
        let requests = wave_one.requests(&self.builder);
        stats.wave_two_calls = requests.len();
        debug!("Wave 2: {} calls", requests.len());
        let results = self.dispatcher.execute(requests).await?;
        let wave_two = wave_one.resolve(&results, observer, &mut stats);

        // Finalize
        let quotes = wave_two.finalize(&self.calculator, observer, &mut stats);
        let pairs = assembler::assemble(pools, &quotes);

        info!(
            "Token pair discovery: {} pools | {}/{} valid pairs | calls {}+{} | {} failed legs | {} clamped | {}ms",
            stats.pools,
            stats.valid_candidates,
            stats.candidates,
            stats.wave_one_calls,
            stats.wave_two_calls,
            stats.failed_legs,
            stats.clamped_ratios,
            started.elapsed().as_millis()
        );

        Ok(DiscoveryOutput { pairs, stats })
    }
}
