//! On-chain simulation backends

pub mod multicall_quoter;

pub use multicall_quoter::{decode_sub_result, CallTargets, MulticallQuoter};
