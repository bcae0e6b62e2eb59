//! Shared types and identifiers for Braid.
//!
//! This crate defines the core types used across the Braid workspace:
//! the owner identity ([`OwnerId`]), the per-shard metadata row
//! ([`ShardRecord`]), the listing entry ([`FileSummary`]), the shard
//! digest ([`ShardDigest`]), and the erasure-coding configuration
//! ([`ErasureParams`]).

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Opaque identity of the user that owns a file.
///
/// Foreign to the external user store; Braid only ever scopes queries by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Wrap a raw user id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Return the raw numeric id.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for OwnerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Digests
// ---------------------------------------------------------------------------

/// SHA-256 digest of a shard's bytes as stored, rendered as 64 lowercase
/// hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardDigest([u8; 32]);

impl ShardDigest {
    /// Compute the digest of the given bytes.
    pub fn from_data(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Return the raw 32-byte representation.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for ShardDigest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for ShardDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ShardDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShardDigest({self})")
    }
}

// ---------------------------------------------------------------------------
// Metadata rows
// ---------------------------------------------------------------------------

/// One metadata row per stored shard.
///
/// For a stored file there are exactly `n = k + m` rows, one per
/// `shard_index` in `[0, n)`. All rows of a file share the same
/// `original_file_size`, and `shard_byte_size` equals
/// `ceil(original_file_size / k)` on every row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRecord {
    /// The user that owns the file.
    pub owner_id: OwnerId,
    /// User-visible file name; unique per owner while the file exists.
    pub original_filename: String,
    /// Globally unique blob key, minted by the orchestrator at upload time.
    pub shard_name: String,
    /// Position in the erasure coding: data shards `[0, k)`, parity `[k, n)`.
    pub shard_index: u8,
    /// SHA-256 of the padded shard bytes as stored at the backend.
    pub shard_sha256: ShardDigest,
    /// Length of the shard blob; identical across siblings.
    pub shard_byte_size: u64,
    /// Length of the original file; identical across siblings.
    pub original_file_size: u64,
    /// Unix timestamp (seconds) set on insertion, immutable afterwards.
    pub created_at: u64,
}

/// One listing entry per owned file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    /// User-visible file name.
    pub original_filename: String,
    /// Length of the original file in bytes.
    pub original_file_size: u64,
    /// Total number of shards the file was encoded into (`k + m`).
    pub shards_total: u8,
    /// Number of shard indices whose backend existence probe succeeded.
    ///
    /// Informational only: reflects backend presence, not digest validity,
    /// and is never persisted.
    pub shards_retrievable: u8,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Erasure coding parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErasureParams {
    /// Number of data shards (`k`).
    pub data_shards: u8,
    /// Number of parity shards (`m`).
    pub parity_shards: u8,
}

impl ErasureParams {
    /// Total shard count `n = k + m`.
    pub const fn total(&self) -> usize {
        self.data_shards as usize + self.parity_shards as usize
    }
}

impl Default for ErasureParams {
    fn default() -> Self {
        Self {
            data_shards: 4,
            parity_shards: 2,
        }
    }
}

/// Current wall-clock time as unix seconds.
pub fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
