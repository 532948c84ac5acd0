//! Batch Dispatcher
//!
//! Submits one wave of keyed simulations to a `QuoteBackend` and maps the
//! per-call outcomes back to their `QuoteKey`. Chunking and RPC limits are the
//! backend's concern.
//!
//! A per-call failure is `None` in the returned map and never affects its
//! siblings. A backend error or a result count that does not match the
//! submitted calls fails the whole wave. There is no retry here.

use super::requests::{QuoteKey, QuoteRequest, TradeSimulator};
use crate::errors::DiscoveryError;
use alloy::primitives::U256;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// On-chain simulation capability
#[async_trait]
pub trait QuoteBackend: Send + Sync {
    /// Simulate every trade; one entry per input, in input order.
    /// `None` marks a reverted, empty or undecodable call.
    async fn simulate(
        &self,
        simulators: &[TradeSimulator],
    ) -> Result<Vec<Option<U256>>, DiscoveryError>;
}

pub struct BatchDispatcher<B> {
    backend: B,
}

impl<B: QuoteBackend> BatchDispatcher<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Execute one wave
    pub async fn execute(
        &self,
        requests: Vec<QuoteRequest>,
    ) -> Result<HashMap<QuoteKey, Option<U256>>, DiscoveryError> {
        if requests.is_empty() {
            return Ok(HashMap::new());
        }

        let (keys, simulators): (Vec<QuoteKey>, Vec<TradeSimulator>) = requests
            .into_iter()
            .map(|r| (r.key, r.simulator))
            .unzip();

        let outcomes = self.backend.simulate(&simulators).await?;

        if outcomes.len() != keys.len() {
            return Err(DiscoveryError::MalformedBatch {
                expected: keys.len(),
                actual: outcomes.len(),
            });
        }

        let failed = outcomes.iter().filter(|o| o.is_none()).count();
        debug!("Dispatched {} calls: {} failed", keys.len(), failed);

        Ok(keys.into_iter().zip(outcomes).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::requests::Leg;
    use crate::types::ProtocolVersion;
    use alloy::primitives::Address;

    struct FixedBackend {
        outcomes: Vec<Option<U256>>,
    }

    #[async_trait]
    impl QuoteBackend for FixedBackend {
        async fn simulate(
            &self,
            _simulators: &[TradeSimulator],
        ) -> Result<Vec<Option<U256>>, DiscoveryError> {
            Ok(self.outcomes.clone())
        }
    }

    struct DownBackend;

    #[async_trait]
    impl QuoteBackend for DownBackend {
        async fn simulate(
            &self,
            _simulators: &[TradeSimulator],
        ) -> Result<Vec<Option<U256>>, DiscoveryError> {
            Err(DiscoveryError::Transport("connection refused".to_string()))
        }
    }

    fn request(leg: Leg) -> QuoteRequest {
        QuoteRequest {
            key: QuoteKey {
                pool_id: "pool-1".to_string(),
                token_a: Address::with_last_byte(1),
                token_b: Address::with_last_byte(2),
                leg,
            },
            simulator: TradeSimulator::Swap {
                version: ProtocolVersion::V2,
                pool_id: "pool-1".to_string(),
                pool: Address::with_last_byte(0xaa),
                token_in: Address::with_last_byte(1),
                token_out: Address::with_last_byte(2),
                amount_in: U256::from(100u64),
            },
        }
    }

    #[tokio::test]
    async fn test_failed_call_does_not_affect_siblings() {
        let dispatcher = BatchDispatcher::new(FixedBackend {
            outcomes: vec![None, Some(U256::from(42u64))],
        });
        let results = dispatcher
            .execute(vec![request(Leg::EffectivePrice), request(Leg::AToB)])
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[&request(Leg::EffectivePrice).key], None);
        assert_eq!(results[&request(Leg::AToB).key], Some(U256::from(42u64)));
    }

    #[tokio::test]
    async fn test_length_mismatch_is_hard_failure() {
        let dispatcher = BatchDispatcher::new(FixedBackend {
            outcomes: vec![Some(U256::from(1u64))],
        });
        let err = dispatcher
            .execute(vec![request(Leg::EffectivePrice), request(Leg::AToB)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DiscoveryError::MalformedBatch { expected: 2, actual: 1 }
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let dispatcher = BatchDispatcher::new(DownBackend);
        let result = dispatcher.execute(vec![request(Leg::AToB)]).await;
        tokio_test::assert_err!(result);
    }

    #[tokio::test]
    async fn test_empty_wave_skips_backend() {
        let dispatcher = BatchDispatcher::new(DownBackend);
        let results = tokio_test::assert_ok!(dispatcher.execute(Vec::new()).await);
        assert!(results.is_empty());
    }
}
