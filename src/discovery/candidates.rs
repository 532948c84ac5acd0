//! Candidate Pair Generator
//!
//! Enumerates every admissible (tokenA, tokenB) pair of a pool. V2 pools pair
//! their tokens with each other and skip the pool's own share token if it
//! appears in the token list. V3 pools additionally pair the share token
//! (as tokenA) with each pool token, simulated as single-token exits/joins.
//!
//! Invalid candidates are still emitted so downstream stages can see them,
//! but they never reach the network.

use crate::types::{PoolSnapshot, ProtocolVersion, TokenPairCandidate, TokenRef};
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Pool-level admission check: TVL at or above the threshold and every
/// constituent token holding a non-zero raw and USD balance.
///
/// The share token, when listed among a V2 pool's tokens, is not a
/// constituent and is ignored here.
pub fn is_pool_admissible(pool: &PoolSnapshot, min_tvl_usd: Decimal) -> bool {
    if pool.total_liquidity_usd < min_tvl_usd {
        return false;
    }
    pool.tokens
        .iter()
        .filter(|t| t.address != pool.address)
        .all(|t| !t.balance.is_zero() && t.balance_usd > Decimal::ZERO)
}

/// Generate all candidates for one pool
pub fn generate_candidates(pool: &PoolSnapshot, min_tvl_usd: Decimal) -> Vec<TokenPairCandidate> {
    let valid = is_pool_admissible(pool, min_tvl_usd);
    if !valid && pool.total_liquidity_usd >= min_tvl_usd {
        warn!(
            "Pool {} has ${} TVL but an empty token balance, skipping",
            pool.id, pool.total_liquidity_usd
        );
    }

    let tokens: Vec<TokenRef> = pool
        .tokens
        .iter()
        .filter(|t| t.address != pool.address)
        .map(TokenRef::from)
        .collect();

    let make = |token_a: TokenRef, token_b: TokenRef| TokenPairCandidate {
        pool_id: pool.id.clone(),
        pool_address: pool.address,
        protocol_version: pool.protocol_version,
        pool_token_count: pool.tokens.len(),
        token_a,
        token_b,
        valid,
        pool_tvl_usd: pool.total_liquidity_usd,
    };

    let mut candidates = Vec::new();

    for (i, token_a) in tokens.iter().enumerate() {
        for token_b in tokens.iter().skip(i + 1) {
            candidates.push(make(token_a.clone(), token_b.clone()));
        }
    }

    if pool.protocol_version == ProtocolVersion::V3 {
        let share = pool.share_token();
        for token in &tokens {
            candidates.push(make(share.clone(), token.clone()));
        }
    }

    debug!(
        "Pool {} ({}): {} candidates, valid={}",
        pool.id,
        pool.protocol_version,
        candidates.len(),
        valid
    );

    candidates
}

/// Generate candidates for every pool, preserving pool order
pub fn generate_all(pools: &[PoolSnapshot], min_tvl_usd: Decimal) -> Vec<TokenPairCandidate> {
    pools
        .iter()
        .flat_map(|pool| generate_candidates(pool, min_tvl_usd))
        .collect()
}
