use std::collections::TryReserveError;

use thiserror::Error;

/// Result alias used by the merge engines.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Errors surfaced by key definition building, source ingestion and merging.
///
/// Every failure is reported to the caller as-is; the engines never retry and
/// never leave a partially ingested session behind.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Growing a source or result array failed.
    #[error("allocation failed: {0}")]
    AllocationFailure(#[from] TryReserveError),
    /// The key-part list cannot form a key definition.
    #[error("invalid key definition: {0}")]
    InvalidSpec(String),
    /// A buffer does not start with the `{tag: [...]}` payload envelope.
    #[error("invalid merge source {buffer}: {reason}")]
    InvalidEnvelope {
        /// Position of the offending buffer in the caller's list.
        buffer: usize,
        /// What the envelope check tripped on.
        reason: String,
    },
    /// A record inside a source is truncated or does not match the key definition.
    #[error("corrupt record stream: {0}")]
    CorruptStream(String),
    /// An externally supplied key cannot be compared against records.
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// A driver entry point was called with malformed arguments.
    #[error("Bad params, use: {0}")]
    BadArguments(&'static str),
}
