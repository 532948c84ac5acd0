//! Token Pair Discovery
//!
//! Runs one discovery pass over a pool snapshot file and writes the per-pool
//! spot price and normalized liquidity of every token pair as JSON.
//!
//! Usage:
//!     tokenpair-discovery --pools data/pools.json
//!     tokenpair-discovery --config config/discovery.toml --pools data/pools.json --output out.json
//!
//! Notes:
//!     - HTTP provider; all simulations are read-only eth_calls via Multicall3
//!     - Logs go to stderr so stdout can carry the report
//!     - Nothing is written when a wave fails

use alloy::providers::{Provider, ProviderBuilder};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokenpair_discovery::discovery::assembler::to_pool_token_pairs;
use tokenpair_discovery::{
    DiscoveryConfig, DiscoveryStats, MulticallQuoter, PoolSnapshot, PoolTokenPairs,
    TokenPairDiscovery,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

// ── CLI Arguments ───────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tokenpair-discovery", about = "Discover spot prices and normalized liquidity of pool token pairs")]
struct Args {
    /// Discovery configuration (TOML)
    #[arg(short, long, env = "DISCOVERY_CONFIG", default_value = "config/discovery.toml")]
    config: PathBuf,

    /// Pool snapshots (JSON array)
    #[arg(short, long, env = "DISCOVERY_POOLS")]
    pools: PathBuf,

    /// Report destination (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,
}

/// JSON report written per run
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscoveryReport {
    generated_at: DateTime<Utc>,
    chain: String,
    block_number: u64,
    stats: DiscoveryStats,
    pools: Vec<PoolTokenPairs>,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.json);

    let config = DiscoveryConfig::load(&args.config)?;
    info!(
        "Configuration loaded from {} (chain: {})",
        args.config.display(),
        config.network.chain_name
    );

    let rpc_url = config.network.rpc_url.clone();
    if rpc_url.is_empty() {
        bail!("No RPC URL: set network.rpc_url or RPC_URL");
    }

    let pools = PoolSnapshot::load_all(&args.pools)?;
    info!("Loaded {} pools from {}", pools.len(), args.pools.display());

    // Create HTTP provider
    let provider = ProviderBuilder::new().connect_http(rpc_url.parse().context("Invalid RPC URL")?);
    let block_number = provider
        .get_block_number()
        .await
        .context("Failed to connect to RPC")?;
    info!("Connected! Current block: {}", block_number);

    // Every wave reads the block the report names
    let quoter = MulticallQuoter::new(Arc::new(provider), &config).with_block(block_number);
    let discovery = TokenPairDiscovery::new(quoter, &config.discovery);

    let output = discovery
        .discover_token_pair_prices(&pools)
        .await
        .context("Token pair discovery failed")?;

    let report = DiscoveryReport {
        generated_at: Utc::now(),
        chain: config.network.chain_name.clone(),
        block_number,
        stats: output.stats,
        pools: to_pool_token_pairs(&output.pairs),
    };
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
