//! Multicall3 Batch Quoter
//!
//! `QuoteBackend` that runs trade simulations as sub-calls of Multicall3
//! `aggregate3` with `allowFailure: true`, so one reverting query never takes
//! its siblings down.
//!
//! Routing:
//! - V2 swaps → `BalancerQueries.querySwap` (GIVEN_IN)
//! - V3 swaps → `Router.querySwapSingleTokenExactIn`
//! - share-token withdraw → `Router.queryRemoveLiquiditySingleTokenExactIn`
//! - share-token deposit → `Router.queryAddLiquidityUnbalanced`
//!
//! Sub-calls are chunked into several `eth_call`s; chunks run with bounded
//! concurrency and are reassembled in input order. With a pinned block every
//! chunk of every wave reads the same chain state.

use crate::config::DiscoveryConfig;
use crate::contracts::IMulticall3::{self, Call3};
use crate::contracts::{IBalancerQueries, IBalancerV3Router};
use crate::discovery::{QuoteBackend, TradeSimulator};
use crate::errors::DiscoveryError;
use crate::types::ProtocolVersion;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::Provider;
use alloy::rpc::types::BlockId;
use alloy::sol_types::{decode_revert_reason, SolCall};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Balancer V2 SwapKind.GIVEN_IN
const SWAP_KIND_GIVEN_IN: u8 = 0;

/// Query contracts each simulation is routed to
#[derive(Debug, Clone, Copy)]
pub struct CallTargets {
    pub balancer_queries: Address,
    pub v3_router: Address,
}

impl CallTargets {
    /// Encode one simulation as an `aggregate3` sub-call.
    /// Returns `None` when a V2 pool id is not a valid bytes32.
    pub fn encode(&self, simulator: &TradeSimulator) -> Option<Call3> {
        let (target, call_data) = match simulator {
            TradeSimulator::Swap {
                version: ProtocolVersion::V2,
                pool_id,
                token_in,
                token_out,
                amount_in,
                ..
            } => {
                let pool_id = match B256::from_str(pool_id) {
                    Ok(id) => id,
                    Err(_) => {
                        debug!("Pool id {} is not bytes32, skipping V2 query", pool_id);
                        return None;
                    }
                };
                let call = IBalancerQueries::querySwapCall {
                    singleSwap: IBalancerQueries::SingleSwap {
                        poolId: pool_id,
                        kind: SWAP_KIND_GIVEN_IN,
                        assetIn: *token_in,
                        assetOut: *token_out,
                        amount: *amount_in,
                        userData: Bytes::new(),
                    },
                    funds: IBalancerQueries::FundManagement {
                        sender: Address::ZERO,
                        fromInternalBalance: false,
                        recipient: Address::ZERO,
                        toInternalBalance: false,
                    },
                };
                (self.balancer_queries, call.abi_encode())
            }
            TradeSimulator::Swap {
                version: ProtocolVersion::V3,
                pool,
                token_in,
                token_out,
                amount_in,
                ..
            } => {
                let call = IBalancerV3Router::querySwapSingleTokenExactInCall {
                    pool: *pool,
                    tokenIn: *token_in,
                    tokenOut: *token_out,
                    exactAmountIn: *amount_in,
                    sender: Address::ZERO,
                    userData: Bytes::new(),
                };
                (self.v3_router, call.abi_encode())
            }
            TradeSimulator::BptWithdraw { pool, bpt_in, token_out } => {
                let call = IBalancerV3Router::queryRemoveLiquiditySingleTokenExactInCall {
                    pool: *pool,
                    exactBptAmountIn: *bpt_in,
                    tokenOut: *token_out,
                    sender: Address::ZERO,
                    userData: Bytes::new(),
                };
                (self.v3_router, call.abi_encode())
            }
            TradeSimulator::BptDeposit { pool, amounts_in } => {
                let call = IBalancerV3Router::queryAddLiquidityUnbalancedCall {
                    pool: *pool,
                    exactAmountsIn: amounts_in.clone(),
                    sender: Address::ZERO,
                    userData: Bytes::new(),
                };
                (self.v3_router, call.abi_encode())
            }
        };

        Some(Call3 {
            target,
            allowFailure: true,
            callData: Bytes::from(call_data),
        })
    }
}

/// Decode a sub-call outcome. Every query returns a single uint256.
///
/// - success=false → revert (Error(string), Panic, custom error or empty)
/// - success=true with < 32 bytes → not a query result
/// - zero amount → pool cannot fill the trade
pub fn decode_sub_result(success: bool, return_data: &[u8]) -> Option<U256> {
    if !success {
        match decode_revert_reason(return_data) {
            Some(reason) => debug!("Simulation reverted: {}", reason),
            None => debug!("Simulation reverted ({} bytes of revert data)", return_data.len()),
        }
        return None;
    }

    if return_data.len() < 32 {
        debug!("Simulation returned insufficient data ({} bytes)", return_data.len());
        return None;
    }

    let amount_out = U256::from_be_slice(&return_data[..32]);
    if amount_out.is_zero() {
        debug!("Simulation returned zero");
        return None;
    }
    Some(amount_out)
}

fn map_contract_error(err: alloy::contract::Error) -> DiscoveryError {
    match err {
        alloy::contract::Error::TransportError(e) => DiscoveryError::Transport(e.to_string()),
        other => DiscoveryError::Decode(other.to_string()),
    }
}

/// Batch quoter over Multicall3
pub struct MulticallQuoter<P> {
    provider: Arc<P>,
    multicall_address: Address,
    targets: CallTargets,
    batch_size: usize,
    max_concurrent_batches: usize,
    block: Option<BlockId>,
}

impl<P: Provider + 'static> MulticallQuoter<P> {
    pub fn new(provider: Arc<P>, config: &DiscoveryConfig) -> Self {
        let targets = CallTargets {
            balancer_queries: config.network.balancer_queries,
            v3_router: config.network.v3_router,
        };

        info!(
            "MulticallQuoter initialized: Multicall3={:?}, BalancerQueries={:?}, V3Router={:?}",
            config.network.multicall3, targets.balancer_queries, targets.v3_router
        );

        Self {
            provider,
            multicall_address: config.network.multicall3,
            targets,
            batch_size: config.discovery.multicall_batch_size.max(1),
            max_concurrent_batches: config.discovery.max_concurrent_batches.max(1),
            block: None,
        }
    }

    /// Run every `aggregate3` against this block instead of `latest`
    pub fn with_block(mut self, block_number: u64) -> Self {
        self.block = Some(BlockId::number(block_number));
        self
    }

    pub fn pinned_block(&self) -> Option<BlockId> {
        self.block
    }

    /// One `aggregate3` eth_call
    async fn aggregate(&self, calls: Vec<Call3>) -> Result<Vec<Option<U256>>, DiscoveryError> {
        let expected = calls.len();
        let multicall = IMulticall3::new(self.multicall_address, self.provider.clone());

        let mut call = multicall.aggregate3(calls);
        if let Some(block) = self.block {
            call = call.block(block);
        }
        let results = call.call().await.map_err(map_contract_error)?;

        if results.len() != expected {
            return Err(DiscoveryError::MalformedBatch {
                expected,
                actual: results.len(),
            });
        }

        Ok(results
            .into_iter()
            .map(|r| decode_sub_result(r.success, &r.returnData))
            .collect())
    }
}

#[async_trait]
impl<P: Provider + 'static> QuoteBackend for MulticallQuoter<P> {
    async fn simulate(
        &self,
        simulators: &[TradeSimulator],
    ) -> Result<Vec<Option<U256>>, DiscoveryError> {
        let encoded: Vec<Option<Call3>> =
            simulators.iter().map(|s| self.targets.encode(s)).collect();
        let sent: Vec<bool> = encoded.iter().map(Option::is_some).collect();
        let calls: Vec<Call3> = encoded.into_iter().flatten().collect();

        if calls.is_empty() {
            return Ok(vec![None; simulators.len()]);
        }

        let batches: Vec<Vec<Call3>> = calls.chunks(self.batch_size).map(<[Call3]>::to_vec).collect();
        debug!(
            "Multicall: {} sub-calls in {} batches (max {} in flight)",
            calls.len(),
            batches.len(),
            self.max_concurrent_batches
        );

        let chunks: Vec<Vec<Option<U256>>> = stream::iter(batches.into_iter().map(|b| self.aggregate(b)))
            .buffered(self.max_concurrent_batches)
            .try_collect()
            .await?;

        let mut outcomes = chunks.into_iter().flatten();
        Ok(sent
            .into_iter()
            .map(|was_sent| if was_sent { outcomes.next().flatten() } else { None })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::IMulticall3::{aggregate3Call, Call3Result};
    use alloy::providers::ProviderBuilder;
    use alloy::sol_types::{Revert, SolError};
    use alloy::transports::mock::Asserter;

    const POOL_ID: &str = "0x5c6ee304399dbdb9c8ef030ab642b10820db8f56000200000000000000000014";

    fn targets() -> CallTargets {
        CallTargets {
            balancer_queries: Address::with_last_byte(0x01),
            v3_router: Address::with_last_byte(0x02),
        }
    }

    fn swap(version: ProtocolVersion, pool_id: &str) -> TradeSimulator {
        TradeSimulator::Swap {
            version,
            pool_id: pool_id.to_string(),
            pool: Address::with_last_byte(0xaa),
            token_in: Address::with_last_byte(0x0a),
            token_out: Address::with_last_byte(0x0b),
            amount_in: U256::from(1_000_000u64),
        }
    }

    fn quoter_config() -> DiscoveryConfig {
        DiscoveryConfig::from_toml(
            r#"
[network]
balancer_queries = "0x0000000000000000000000000000000000000001"
v3_router = "0x0000000000000000000000000000000000000002"

[discovery]
multicall_batch_size = 2
max_concurrent_batches = 1
"#,
        )
        .unwrap()
    }

    /// Encoded `aggregate3` return data where every sub-call succeeded
    fn aggregate_response(amounts: &[u64]) -> Bytes {
        let results: Vec<Call3Result> = amounts
            .iter()
            .map(|a| Call3Result {
                success: true,
                returnData: Bytes::from(U256::from(*a).to_be_bytes::<32>().to_vec()),
            })
            .collect();
        Bytes::from(aggregate3Call::abi_encode_returns(&results))
    }

    #[tokio::test]
    async fn test_chunks_reassemble_in_input_order() {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());
        let quoter = MulticallQuoter::new(Arc::new(provider), &quoter_config());

        // The unencodable second call is never sent, so the two chunks carry
        // calls 1, 3 and 4.
        asserter.push_success(&aggregate_response(&[11, 22]));
        asserter.push_success(&aggregate_response(&[33]));

        let simulators = vec![
            swap(ProtocolVersion::V2, POOL_ID),
            swap(ProtocolVersion::V2, "bad"),
            swap(ProtocolVersion::V3, "ignored"),
            swap(ProtocolVersion::V2, POOL_ID),
        ];
        let out = quoter.simulate(&simulators).await.unwrap();
        assert_eq!(
            out,
            vec![
                Some(U256::from(11u64)),
                None,
                Some(U256::from(22u64)),
                Some(U256::from(33u64)),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_chunk_fails_whole_wave() {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());
        let quoter = MulticallQuoter::new(Arc::new(provider), &quoter_config());

        asserter.push_success(&aggregate_response(&[11, 22]));
        asserter.push_failure_msg("header not found");

        let simulators = vec![
            swap(ProtocolVersion::V2, POOL_ID),
            swap(ProtocolVersion::V3, "ignored"),
            swap(ProtocolVersion::V2, POOL_ID),
        ];
        let err = quoter.simulate(&simulators).await.unwrap_err();
        assert!(err.is_transport(), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_pinned_block_is_used_for_queries() {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());
        let quoter = MulticallQuoter::new(Arc::new(provider), &quoter_config());
        assert_eq!(quoter.pinned_block(), None);

        let quoter = quoter.with_block(21_000_000);
        assert_eq!(quoter.pinned_block(), Some(BlockId::number(21_000_000)));

        asserter.push_success(&aggregate_response(&[5]));
        let out = quoter
            .simulate(&[swap(ProtocolVersion::V3, "ignored")])
            .await
            .unwrap();
        assert_eq!(out, vec![Some(U256::from(5u64))]);
    }

    #[test]
    fn test_v2_swap_routes_to_balancer_queries() {
        let call = targets().encode(&swap(ProtocolVersion::V2, POOL_ID)).unwrap();
        assert_eq!(call.target, Address::with_last_byte(0x01));
        assert!(call.allowFailure);
        assert_eq!(&call.callData[..4], IBalancerQueries::querySwapCall::SELECTOR.as_slice());

        let decoded = IBalancerQueries::querySwapCall::abi_decode(&call.callData).unwrap();
        assert_eq!(decoded.singleSwap.poolId, B256::from_str(POOL_ID).unwrap());
        assert_eq!(decoded.singleSwap.kind, SWAP_KIND_GIVEN_IN);
        assert_eq!(decoded.singleSwap.amount, U256::from(1_000_000u64));
    }

    #[test]
    fn test_v2_swap_with_bad_pool_id_is_skipped() {
        assert!(targets().encode(&swap(ProtocolVersion::V2, "not-a-pool-id")).is_none());
    }

    #[test]
    fn test_v3_calls_route_to_router() {
        let t = targets();
        let call = t.encode(&swap(ProtocolVersion::V3, "ignored")).unwrap();
        assert_eq!(call.target, Address::with_last_byte(0x02));
        assert_eq!(
            &call.callData[..4],
            IBalancerV3Router::querySwapSingleTokenExactInCall::SELECTOR.as_slice()
        );

        let withdraw = t
            .encode(&TradeSimulator::BptWithdraw {
                pool: Address::with_last_byte(0xaa),
                bpt_in: U256::from(5u64),
                token_out: Address::with_last_byte(0x0a),
            })
            .unwrap();
        assert_eq!(
            &withdraw.callData[..4],
            IBalancerV3Router::queryRemoveLiquiditySingleTokenExactInCall::SELECTOR.as_slice()
        );

        let deposit = t
            .encode(&TradeSimulator::BptDeposit {
                pool: Address::with_last_byte(0xaa),
                amounts_in: vec![U256::ZERO, U256::from(7u64)],
            })
            .unwrap();
        assert_eq!(deposit.target, Address::with_last_byte(0x02));
        let decoded =
            IBalancerV3Router::queryAddLiquidityUnbalancedCall::abi_decode(&deposit.callData).unwrap();
        assert_eq!(decoded.exactAmountsIn, vec![U256::ZERO, U256::from(7u64)]);
    }

    #[test]
    fn test_decode_sub_result_valid() {
        let amount = U256::from(1_000_000_000_000_000_000u64);
        let data = amount.to_be_bytes::<32>();
        assert_eq!(decode_sub_result(true, &data), Some(amount));
    }

    #[test]
    fn test_decode_sub_result_revert() {
        let data = Revert { reason: "BAL#304".to_string() }.abi_encode();
        assert_eq!(decode_sub_result(false, &data), None);
        assert_eq!(decode_sub_result(false, &[]), None);
    }

    #[test]
    fn test_decode_sub_result_short_or_zero() {
        assert_eq!(decode_sub_result(true, &[0u8; 16]), None);
        assert_eq!(decode_sub_result(true, &[0u8; 32]), None);
    }
}
