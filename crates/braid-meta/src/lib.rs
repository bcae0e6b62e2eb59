//! Shard metadata persistence for Braid.
//!
//! One [`ShardRecord`](braid_types::ShardRecord) row per stored shard,
//! queryable by `(owner, original_filename)` and by `(owner, shard_name)`.
//! Backed by Fjall keyspaces on disk or a pure in-memory map.

mod error;
mod store;

pub use error::MetaError;
pub use store::MetaStore;
