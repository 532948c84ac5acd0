//! Token Pair Discovery Library
//!
//! Computes a spot price and a normalized liquidity score for every token
//! pair of Balancer-style pools by simulating trades on-chain. Simulations
//! are batched through Multicall3 in two dependent waves.

pub mod config;
pub mod contracts;
pub mod discovery;
pub mod errors;
pub mod fixed_point;
pub mod onchain;
pub mod types;

// Re-export commonly used types
pub use config::{DiscoveryConfig, DiscoverySettings, NetworkConfig};
pub use discovery::{DiscoveryOutput, DiscoveryStats, QuoteBackend, TokenPairDiscovery};
pub use errors::DiscoveryError;
pub use onchain::MulticallQuoter;
pub use types::{PoolSnapshot, PoolToken, PoolTokenPairs, ProtocolVersion, TokenPairResult};
