//! Quote Request Builder
//!
//! Sizes each valid candidate and turns it into on-chain trade simulations.
//!
//! Two amount scales per pair:
//! - aToBAmountIn: a fraction (default 1%) of tokenA's balance, used for the
//!   forward and round-trip legs that derive the spot price
//! - effectivePriceAmountIn: tokenA worth a fixed USD notional (default $100),
//!   used as the depth reference for normalized liquidity
//!
//! Wave 1 quotes A→B at both sizes. Wave 2 quotes B→A with the wave-1 A→B
//! output as its input, so it can only be built once wave 1 has resolved.

use crate::config::DiscoverySettings;
use crate::fixed_point::decimal_to_wad;
use crate::types::{ProtocolVersion, TokenPairCandidate, TokenPairQuote, TokenRef};
use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use std::fmt;
use tracing::debug;

/// Basis-point denominator for balance fractions
const BPS_DENOMINATOR: u64 = 10_000;

/// Which simulated trade of a pair a result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leg {
    /// A→B at effectivePriceAmountIn
    EffectivePrice,
    /// A→B at aToBAmountIn
    AToB,
    /// B→A at aToBAmountOut
    BToA,
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Leg::EffectivePrice => write!(f, "effectivePriceAmountOut"),
            Leg::AToB => write!(f, "aToBAmountOut"),
            Leg::BToA => write!(f, "bToAAmountOut"),
        }
    }
}

/// Correlates a simulation result back to its pair and leg
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteKey {
    pub pool_id: String,
    pub token_a: Address,
    pub token_b: Address,
    pub leg: Leg,
}

impl QuoteKey {
    pub fn new(candidate: &TokenPairCandidate, leg: Leg) -> Self {
        Self {
            pool_id: candidate.pool_id.clone(),
            token_a: candidate.token_a.address,
            token_b: candidate.token_b.address,
            leg,
        }
    }
}

impl fmt::Display for QuoteKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{:?}-{:?}.{}", self.pool_id, self.token_a, self.token_b, self.leg)
    }
}

/// A read-only trade simulation against the vault/router
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeSimulator {
    /// Exact-in swap between two pool tokens
    Swap {
        version: ProtocolVersion,
        pool_id: String,
        pool: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    },
    /// Burn an exact amount of share token, receive a single pool token
    BptWithdraw {
        pool: Address,
        bpt_in: U256,
        token_out: Address,
    },
    /// Unbalanced deposit with a single non-zero slot, receive share token
    BptDeposit {
        pool: Address,
        amounts_in: Vec<U256>,
    },
}

impl TradeSimulator {
    /// Choose and build the simulation for one leg of a pair.
    ///
    /// Returns `None` when the amount is zero or, for deposits, when tokenB's
    /// index does not fit the pool's token array.
    pub fn for_leg(candidate: &TokenPairCandidate, leg: Leg, amount_in: U256) -> Option<Self> {
        if amount_in.is_zero() {
            return None;
        }
        let token_a = &candidate.token_a;
        let token_b = &candidate.token_b;

        if token_a.is_share_token() {
            return match leg {
                Leg::EffectivePrice | Leg::AToB => Some(TradeSimulator::BptWithdraw {
                    pool: candidate.pool_address,
                    bpt_in: amount_in,
                    token_out: token_b.address,
                }),
                Leg::BToA => {
                    let slot = usize::try_from(token_b.index).ok()?;
                    if slot >= candidate.pool_token_count {
                        return None;
                    }
                    let mut amounts_in = vec![U256::ZERO; candidate.pool_token_count];
                    amounts_in[slot] = amount_in;
                    Some(TradeSimulator::BptDeposit {
                        pool: candidate.pool_address,
                        amounts_in,
                    })
                }
            };
        }

        let (token_in, token_out) = match leg {
            Leg::EffectivePrice | Leg::AToB => (token_a.address, token_b.address),
            Leg::BToA => (token_b.address, token_a.address),
        };
        Some(TradeSimulator::Swap {
            version: candidate.protocol_version,
            pool_id: candidate.pool_id.clone(),
            pool: candidate.pool_address,
            token_in,
            token_out,
            amount_in,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TradeSimulator::Swap { .. } => "swap",
            TradeSimulator::BptWithdraw { .. } => "bpt-withdraw",
            TradeSimulator::BptDeposit { .. } => "bpt-deposit",
        }
    }
}

/// One keyed simulation to dispatch
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub key: QuoteKey,
    pub simulator: TradeSimulator,
}

/// Trade sizing parameters
#[derive(Debug, Clone)]
pub struct QuoteSizing {
    /// Fraction of tokenA balance for the spot-price legs, in basis points
    pub a_to_b_balance_bps: u32,
    /// USD notional of the effective-price leg
    pub effective_price_usd: Decimal,
}

impl From<&DiscoverySettings> for QuoteSizing {
    fn from(settings: &DiscoverySettings) -> Self {
        Self {
            a_to_b_balance_bps: settings.a_to_b_balance_bps,
            effective_price_usd: settings.effective_price_usd,
        }
    }
}

pub struct QuoteRequestBuilder {
    sizing: QuoteSizing,
}

impl QuoteRequestBuilder {
    pub fn new(sizing: QuoteSizing) -> Self {
        Self { sizing }
    }

    /// Fraction of tokenA's raw balance; zero if the product overflows
    pub fn a_to_b_amount_in(&self, token: &TokenRef) -> U256 {
        token
            .balance
            .checked_mul(U256::from(self.sizing.a_to_b_balance_bps))
            .map(|v| v / U256::from(BPS_DENOMINATOR))
            .unwrap_or(U256::ZERO)
    }

    /// Raw tokenA amount worth the USD notional: balance * notional / balanceUsd
    pub fn effective_price_amount_in(&self, token: &TokenRef) -> U256 {
        let balance_usd = decimal_to_wad(token.balance_usd);
        if balance_usd.is_zero() {
            return U256::ZERO;
        }
        token
            .balance
            .checked_mul(decimal_to_wad(self.sizing.effective_price_usd))
            .map(|v| v / balance_usd)
            .unwrap_or(U256::ZERO)
    }

    /// Fresh accumulator for a candidate with its input amounts filled.
    /// Invalid candidates are left unsized.
    pub fn prepare(&self, candidate: TokenPairCandidate) -> TokenPairQuote {
        let mut quote = TokenPairQuote::new(candidate);
        if quote.is_valid() {
            quote.a_to_b_amount_in = self.a_to_b_amount_in(&quote.candidate.token_a);
            quote.effective_price_amount_in =
                self.effective_price_amount_in(&quote.candidate.token_a);
        }
        quote
    }

    /// A→B legs at both sizes for every valid quote
    pub fn wave_one(&self, quotes: &[TokenPairQuote]) -> Vec<QuoteRequest> {
        let mut requests = Vec::with_capacity(quotes.len() * 2);
        for quote in quotes.iter().filter(|q| q.is_valid()) {
            for (leg, amount) in [
                (Leg::EffectivePrice, quote.effective_price_amount_in),
                (Leg::AToB, quote.a_to_b_amount_in),
            ] {
                match TradeSimulator::for_leg(&quote.candidate, leg, amount) {
                    Some(simulator) => requests.push(QuoteRequest {
                        key: QuoteKey::new(&quote.candidate, leg),
                        simulator,
                    }),
                    None => debug!("Skipping {} leg {}: zero amount", quote.label(), leg),
                }
            }
        }
        requests
    }

    /// B→A legs fed by the resolved wave-1 aToBAmountOut
    pub fn wave_two(&self, quotes: &[TokenPairQuote]) -> Vec<QuoteRequest> {
        quotes
            .iter()
            .filter(|q| q.is_valid())
            .filter_map(|quote| {
                TradeSimulator::for_leg(&quote.candidate, Leg::BToA, quote.a_to_b_amount_out).map(
                    |simulator| QuoteRequest {
                        key: QuoteKey::new(&quote.candidate, Leg::BToA),
                        simulator,
                    },
                )
            })
            .collect()
    }
}
