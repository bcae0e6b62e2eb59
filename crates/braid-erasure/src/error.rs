//! Error types for erasure coding operations.

/// Errors that can occur during erasure encoding or decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Not enough shards were provided for decoding.
    #[error("insufficient shards: need {needed}, got {got}")]
    InsufficientShards {
        /// Minimum shards required (k).
        needed: usize,
        /// Shards actually provided.
        got: usize,
    },

    /// The present shard slots disagree on length.
    #[error("inconsistent shard length: slot {index} has {got} bytes, expected {expected}")]
    InconsistentShardLength {
        /// The offending slot index.
        index: usize,
        /// Length found in that slot.
        got: usize,
        /// Length of the first present slot.
        expected: usize,
    },

    /// The inputs do not describe a decodable shard set.
    #[error("invalid parameters: {reason}")]
    InvalidParameters {
        /// Description of the problem.
        reason: String,
    },
}
