//! Token pair price and liquidity discovery
//!
//! Pipeline stages, one module each:
//! - candidates: pool filtering and pair enumeration
//! - requests: trade sizing and simulation selection
//! - dispatcher: batched execution against a `QuoteBackend`
//! - calculator: spot price, effective price, normalized liquidity
//! - assembler: per-pool result grouping
//! - engine: the two-wave orchestration

pub mod assembler;
pub mod calculator;
pub mod candidates;
pub mod diagnostics;
pub mod dispatcher;
pub mod engine;
pub mod requests;

pub use calculator::{PriceCalculator, DEFAULT_PRICE_RATIO_CAP};
pub use diagnostics::{ClampEvent, DiscoveryObserver, NoopObserver, TracingObserver};
pub use dispatcher::{BatchDispatcher, QuoteBackend};
pub use engine::{DiscoveryOutput, DiscoveryStats, TokenPairDiscovery};
pub use requests::{Leg, QuoteKey, QuoteRequest, QuoteRequestBuilder, QuoteSizing, TradeSimulator};
