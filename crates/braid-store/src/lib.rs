//! Blob storage backends for Braid shards.
//!
//! A [`BlobStore`] abstracts one logical storage location: a flat
//! namespace of opaque blobs addressed by orchestrator-minted names.
//! One store instance corresponds to exactly one shard index in the
//! erasure coding; the orchestrator owns the `index -> store` table.
//!
//! Stores never verify digests — integrity checking is the
//! orchestrator's job, so that a corrupted blob surfaces as a mismatch
//! against the metadata row rather than a backend error.

mod error;
mod file_store;
mod memory_store;
mod slow_store;
mod traits;

pub use error::StoreError;
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use slow_store::SlowStore;
pub use traits::BlobStore;
