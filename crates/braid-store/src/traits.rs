//! Core trait for shard blob storage.

use bytes::Bytes;

use crate::error::StoreError;

/// Trait for storing and retrieving shard blobs at one logical location.
///
/// All implementations must be `Send + Sync` for use across async tasks.
/// Data is passed as [`Bytes`] to enable zero-copy transfers through the
/// pipeline.
///
/// Names are chosen by the orchestrator and are flat (no paths).
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a blob under the given name (create-or-overwrite).
    ///
    /// The blob must be durable before this returns success.
    async fn put(&self, name: &str, data: Bytes) -> Result<(), StoreError>;

    /// Retrieve the exact bytes last written under `name`, or `None` if
    /// no such blob exists.
    async fn get(&self, name: &str) -> Result<Option<Bytes>, StoreError>;

    /// Check whether a blob exists.
    async fn exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Delete a blob. Deleting a nonexistent blob is a success.
    async fn delete(&self, name: &str) -> Result<(), StoreError>;
}
