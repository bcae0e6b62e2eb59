//! Reed-Solomon erasure codec over GF(2^8).
//!
//! This crate provides:
//! - [`ReedSolomon`] — splits a byte sequence into `k` data shards and
//!   derives `m` parity shards; reconstructs the original bytes from any
//!   `k` of the `k + m` shards.
//! - [`CodecError`] — the codec error taxonomy.
//!
//! Shard sizing is `ceil(len / k)`: data shards carry the original bytes
//! in order with the final data shard zero-padded, parity shards are
//! derived through an `(n x k)` encoding matrix whose top `k` rows are
//! the identity. The codec holds no mutable state and is reentrant.

mod codec;
mod error;
mod field;
mod matrix;

pub use codec::ReedSolomon;
pub use error::CodecError;
