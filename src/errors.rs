//! Discovery Errors
//!
//! Hard failures only. A reverted or empty leg is not an error: it is
//! carried as a missing value and ends up as a zero-valued result row.
//! Anything in here aborts the whole discovery run so the caller can retry
//! against a fresh block.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// RPC node unreachable, timed out, or rejected the aggregate call
    #[error("transport error: {0}")]
    Transport(String),

    /// Backend returned a different number of results than calls submitted
    #[error("malformed batch response: expected {expected} results, got {actual}")]
    MalformedBatch { expected: usize, actual: usize },

    /// Aggregate response could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

impl DiscoveryError {
    /// True for failures caused by the network rather than by the response shape.
    pub fn is_transport(&self) -> bool {
        matches!(self, DiscoveryError::Transport(_))
    }
}
