//! Configuration management
//!
//! Reads the discovery configuration from a TOML file. `RPC_URL` from the
//! environment (or a `.env` file) overrides the file's `network.rpc_url`.
//!
//! ```toml
//! [network]
//! rpc_url = "https://eth.example.org"
//! balancer_queries = "0xE39B5e3B6D74016b2F6A9673D7d7493B6DF549d5"
//! v3_router = "0xAE563E3f8219521950555F5962419C8919758Ea2"
//!
//! [discovery]
//! min_pool_tvl_usd = "1000"
//! ```

use alloy::primitives::{address, Address};
use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

/// Multicall3 deployed address (same on all EVM chains)
pub const MULTICALL3_ADDRESS: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// Top-level TOML configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    pub network: NetworkConfig,
    #[serde(default)]
    pub discovery: DiscoverySettings,
}

/// Chain endpoint and query contract addresses
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub rpc_url: String,
    #[serde(default = "default_chain_name")]
    pub chain_name: String,
    #[serde(default = "default_multicall3")]
    pub multicall3: Address,
    /// Balancer V2 BalancerQueries helper
    pub balancer_queries: Address,
    /// Balancer V3 Router
    pub v3_router: Address,
}

fn default_chain_name() -> String { "mainnet".to_string() }
fn default_multicall3() -> Address { MULTICALL3_ADDRESS }

/// Sizing, thresholds and batching
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverySettings {
    /// Pools below this TVL produce no quotes
    #[serde(default = "default_min_pool_tvl_usd")]
    pub min_pool_tvl_usd: Decimal,
    /// Spot-price trade size as basis points of tokenA's balance
    #[serde(default = "default_a_to_b_balance_bps")]
    pub a_to_b_balance_bps: u32,
    /// USD notional of the effective-price trade
    #[serde(default = "default_effective_price_usd")]
    pub effective_price_usd: Decimal,
    /// Upper bound on spotPrice / effectivePrice, strictly below 1
    #[serde(default = "default_price_ratio_cap")]
    pub price_ratio_cap: Decimal,
    /// Sub-calls per aggregate3 eth_call
    #[serde(default = "default_multicall_batch_size")]
    pub multicall_batch_size: usize,
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,
}

fn default_min_pool_tvl_usd() -> Decimal { Decimal::from(1000) }
fn default_a_to_b_balance_bps() -> u32 { 100 }
fn default_effective_price_usd() -> Decimal { Decimal::from(100) }
fn default_price_ratio_cap() -> Decimal { Decimal::new(999_999, 6) }
fn default_multicall_batch_size() -> usize { 100 }
fn default_max_concurrent_batches() -> usize { 4 }

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            min_pool_tvl_usd: default_min_pool_tvl_usd(),
            a_to_b_balance_bps: default_a_to_b_balance_bps(),
            effective_price_usd: default_effective_price_usd(),
            price_ratio_cap: default_price_ratio_cap(),
            multicall_batch_size: default_multicall_batch_size(),
            max_concurrent_batches: default_max_concurrent_batches(),
        }
    }
}

impl DiscoverySettings {
    pub fn validate(&self) -> Result<()> {
        if self.price_ratio_cap <= Decimal::ZERO || self.price_ratio_cap >= Decimal::ONE {
            bail!("price_ratio_cap must be between 0 and 1, got {}", self.price_ratio_cap);
        }
        if self.a_to_b_balance_bps == 0 || self.a_to_b_balance_bps > 10_000 {
            bail!("a_to_b_balance_bps must be in 1..=10000, got {}", self.a_to_b_balance_bps);
        }
        if self.effective_price_usd <= Decimal::ZERO {
            bail!("effective_price_usd must be positive");
        }
        if self.min_pool_tvl_usd < Decimal::ZERO {
            bail!("min_pool_tvl_usd must not be negative");
        }
        if self.multicall_batch_size == 0 {
            bail!("multicall_batch_size must be at least 1");
        }
        if self.max_concurrent_batches == 0 {
            bail!("max_concurrent_batches must be at least 1");
        }
        Ok(())
    }
}

impl DiscoveryConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenv::dotenv().ok();

        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config = Self::from_toml(&content)?;
        if let Ok(rpc_url) = std::env::var("RPC_URL") {
            config.network.rpc_url = rpc_url;
        }
        Ok(config)
    }

    /// Parse and validate without touching the environment
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        config.discovery.validate()?;
        Ok(config)
    }
}
