// Core data structures for token pair discovery

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Index sentinel for a pool's own share token (BPT) used as a pseudo-token
pub const SHARE_TOKEN_INDEX: i32 = -1;

/// Decimals of every pool share token
pub const SHARE_TOKEN_DECIMALS: u8 = 18;

/// Vault/protocol generation a pool belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// Token list may contain the pool's own share token, which is never paired
    #[serde(rename = "v2", alias = "V2")]
    V2,
    /// Share token is addressed separately and paired with every pool token
    #[serde(rename = "v3", alias = "V3")]
    V3,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProtocolVersion::V2 => write!(f, "v2"),
            ProtocolVersion::V3 => write!(f, "v3"),
        }
    }
}

/// A token held by a pool, as supplied by the sync pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolToken {
    pub address: Address,
    pub decimals: u8,
    /// Raw balance in the token's native decimals
    pub balance: U256,
    pub balance_usd: Decimal,
    /// Position in the pool's token array
    pub index: i32,
}

/// Read-only pool state consumed by discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSnapshot {
    /// bytes32 pool id for V2, pool address for V3
    pub id: String,
    pub protocol_version: ProtocolVersion,
    pub address: Address,
    pub tokens: Vec<PoolToken>,
    /// Raw share supply (18 decimals)
    pub total_shares: U256,
    pub total_liquidity_usd: Decimal,
}

impl PoolSnapshot {
    /// Load a JSON array of snapshots (the format written by the sync job)
    pub fn load_all<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read pool snapshots: {}", path.as_ref().display())
        })?;

        let pools: Vec<Self> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse pool snapshots: {}", path.as_ref().display()))?;

        Ok(pools)
    }

    /// The pool's share token seen as a pseudo-token of the pool
    pub fn share_token(&self) -> TokenRef {
        TokenRef {
            address: self.address,
            decimals: SHARE_TOKEN_DECIMALS,
            balance: self.total_shares,
            balance_usd: self.total_liquidity_usd,
            index: SHARE_TOKEN_INDEX,
        }
    }
}

/// Token side of a candidate pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRef {
    pub address: Address,
    pub decimals: u8,
    pub balance: U256,
    pub balance_usd: Decimal,
    pub index: i32,
}

impl TokenRef {
    pub fn is_share_token(&self) -> bool {
        self.index == SHARE_TOKEN_INDEX
    }
}

impl From<&PoolToken> for TokenRef {
    fn from(token: &PoolToken) -> Self {
        Self {
            address: token.address,
            decimals: token.decimals,
            balance: token.balance,
            balance_usd: token.balance_usd,
            index: token.index,
        }
    }
}

/// An admissible (tokenA, tokenB) pair within one pool
#[derive(Debug, Clone)]
pub struct TokenPairCandidate {
    pub pool_id: String,
    pub pool_address: Address,
    pub protocol_version: ProtocolVersion,
    /// Number of tokens in the pool (sizes unbalanced deposit arrays)
    pub pool_token_count: usize,
    pub token_a: TokenRef,
    pub token_b: TokenRef,
    /// Only valid candidates are ever simulated on-chain
    pub valid: bool,
    pub pool_tvl_usd: Decimal,
}

/// Per-candidate accumulator for one discovery run.
///
/// Amounts are raw (native decimals). Prices and liquidity are WAD and are
/// only filled after both call waves have resolved.
#[derive(Debug, Clone)]
pub struct TokenPairQuote {
    pub candidate: TokenPairCandidate,
    /// Fraction of tokenA balance (default 1%)
    pub a_to_b_amount_in: U256,
    /// tokenA amount worth the effective-price notional (default $100)
    pub effective_price_amount_in: U256,
    pub a_to_b_amount_out: U256,
    pub b_to_a_amount_out: U256,
    pub effective_price_amount_out: U256,
    pub effective_price: U256,
    pub spot_price: U256,
    pub normalized_liquidity: U256,
}

impl TokenPairQuote {
    pub fn new(candidate: TokenPairCandidate) -> Self {
        Self {
            candidate,
            a_to_b_amount_in: U256::ZERO,
            effective_price_amount_in: U256::ZERO,
            a_to_b_amount_out: U256::ZERO,
            b_to_a_amount_out: U256::ZERO,
            effective_price_amount_out: U256::ZERO,
            effective_price: U256::ZERO,
            spot_price: U256::ZERO,
            normalized_liquidity: U256::ZERO,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.candidate.valid
    }

    /// Short label for log lines
    pub fn label(&self) -> String {
        format!(
            "{} {:?}->{:?}",
            self.candidate.pool_id, self.candidate.token_a.address, self.candidate.token_b.address
        )
    }
}

/// Row persisted per (pool, tokenA, tokenB)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResult {
    pub pool_id: String,
    pub token_a: Address,
    pub token_b: Address,
    /// Decimal-ether string
    pub normalized_liquidity: String,
    /// Decimal-ether string
    pub spot_price: String,
}

/// All result rows of one pool, in the JSON output shape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolTokenPairs {
    pub pool_id: String,
    pub pairs: Vec<TokenPairResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_pool_snapshot_json() {
        let json = r#"[{
            "id": "0x5c6ee304399dbdb9c8ef030ab642b10820db8f56000200000000000000000014",
            "protocolVersion": "v2",
            "address": "0x5c6ee304399dbdb9c8ef030ab642b10820db8f56",
            "tokens": [
                {
                    "address": "0xba100000625a3754423978a60c9317c58a424e3d",
                    "decimals": 18,
                    "balance": "1000000000000000000000",
                    "balanceUsd": "4000.5",
                    "index": 0
                }
            ],
            "totalShares": "500000000000000000000",
            "totalLiquidityUsd": 5000
        }]"#;

        let pools: Vec<PoolSnapshot> = serde_json::from_str(json).unwrap();
        assert_eq!(pools.len(), 1);
        let pool = &pools[0];
        assert_eq!(pool.protocol_version, ProtocolVersion::V2);
        assert_eq!(pool.tokens[0].balance, U256::from(1000u64) * U256::from(10u64).pow(U256::from(18)));
        assert_eq!(pool.tokens[0].balance_usd, dec!(4000.5));
        assert_eq!(pool.total_liquidity_usd, dec!(5000));
    }

    #[test]
    fn test_share_token_ref() {
        let pool = PoolSnapshot {
            id: "0xpool".to_string(),
            protocol_version: ProtocolVersion::V3,
            address: Address::with_last_byte(9),
            tokens: vec![],
            total_shares: U256::from(42u64),
            total_liquidity_usd: dec!(2500),
        };
        let bpt = pool.share_token();
        assert!(bpt.is_share_token());
        assert_eq!(bpt.decimals, 18);
        assert_eq!(bpt.balance, U256::from(42u64));
        assert_eq!(bpt.balance_usd, dec!(2500));
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let row = TokenPairResult {
            pool_id: "p".to_string(),
            token_a: Address::with_last_byte(1),
            token_b: Address::with_last_byte(2),
            normalized_liquidity: "1000000".to_string(),
            spot_price: "2".to_string(),
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("\"normalizedLiquidity\":\"1000000\""));
        assert!(json.contains("\"spotPrice\":\"2\""));
    }
}
