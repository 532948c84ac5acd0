//! Output Assembler
//!
//! Groups finalized quotes under their pool for persistence. Every input pool
//! gets an entry, in input order; only valid candidates produce rows.

use crate::fixed_point::format_wad;
use crate::types::{PoolSnapshot, PoolTokenPairs, TokenPairQuote, TokenPairResult};
use indexmap::IndexMap;

impl From<&TokenPairQuote> for TokenPairResult {
    fn from(quote: &TokenPairQuote) -> Self {
        Self {
            pool_id: quote.candidate.pool_id.clone(),
            token_a: quote.candidate.token_a.address,
            token_b: quote.candidate.token_b.address,
            normalized_liquidity: format_wad(quote.normalized_liquidity),
            spot_price: format_wad(quote.spot_price),
        }
    }
}

/// Result rows keyed by pool id
pub fn assemble(
    pools: &[PoolSnapshot],
    quotes: &[TokenPairQuote],
) -> IndexMap<String, Vec<TokenPairResult>> {
    let mut grouped: IndexMap<String, Vec<TokenPairResult>> = pools
        .iter()
        .map(|pool| (pool.id.clone(), Vec::new()))
        .collect();

    for quote in quotes.iter().filter(|q| q.is_valid()) {
        grouped
            .entry(quote.candidate.pool_id.clone())
            .or_default()
            .push(TokenPairResult::from(quote));
    }

    grouped
}

/// Flatten into the JSON output shape
pub fn to_pool_token_pairs(grouped: &IndexMap<String, Vec<TokenPairResult>>) -> Vec<PoolTokenPairs> {
    grouped
        .iter()
        .map(|(pool_id, pairs)| PoolTokenPairs {
            pool_id: pool_id.clone(),
            pairs: pairs.clone(),
        })
        .collect()
}
