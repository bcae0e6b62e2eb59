//! [`FileEngine`] — the data-plane trait for protocol adapters.
//!
//! Protocol adapters (the HTTP boundary, CLI tooling, tests) depend on
//! this trait instead of the concrete [`BraidNode`](crate::BraidNode)
//! struct, making them interchangeable.

use braid_types::{FileSummary, OwnerId};
use bytes::Bytes;

use crate::error::EngineError;

/// The data-plane interface exposed to protocol adapters.
///
/// Covers the four operations of the storage core:
///
/// - **upload** — erasure-encode a file and fan its shards out
/// - **retrieve** — reconstruct a file, self-healing damaged shards
/// - **list** — enumerate owned files with shard availability
/// - **delete** — remove a file, metadata first
#[async_trait::async_trait]
pub trait FileEngine: Send + Sync {
    /// Store a file under `original_filename` for `owner`.
    ///
    /// Fails with [`EngineError::AlreadyExists`] if the owner already has
    /// a file of that name, and with [`EngineError::UploadFailed`] (after
    /// compensating deletes) if any shard write fails.
    async fn upload(
        &self,
        owner: OwnerId,
        original_filename: &str,
        data: Bytes,
    ) -> Result<(), EngineError>;

    /// Reconstruct and return the file's bytes.
    ///
    /// Missing or corrupted shards are tolerated up to the parity count
    /// and re-created in the background of the same call; beyond that the
    /// call fails with [`EngineError::Unrecoverable`].
    async fn retrieve(
        &self,
        owner: OwnerId,
        original_filename: &str,
    ) -> Result<Vec<u8>, EngineError>;

    /// One summary per owned file, including how many shard blobs are
    /// currently reachable.
    async fn list(&self, owner: OwnerId) -> Result<Vec<FileSummary>, EngineError>;

    /// Delete a file: metadata rows first (the authoritative boundary),
    /// then blobs best-effort.
    async fn delete(&self, owner: OwnerId, original_filename: &str) -> Result<(), EngineError>;
}
