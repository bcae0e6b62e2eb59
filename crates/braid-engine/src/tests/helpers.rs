//! Shared fixtures for the engine tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use braid_meta::MetaStore;
use braid_store::{BlobStore, MemoryStore, StoreError};
use braid_types::{OwnerId, ShardRecord};
use bytes::Bytes;

use crate::{BraidNode, BraidNodeConfig};

pub const OWNER: OwnerId = OwnerId::new(42);

/// A node over six in-memory backends, with direct handles to the
/// underlying stores so tests can delete or corrupt blobs out-of-band.
pub struct TestCluster {
    pub node: Arc<BraidNode>,
    pub backends: Vec<Arc<MemoryStore>>,
    pub meta: Arc<MetaStore>,
}

pub fn cluster() -> TestCluster {
    cluster_with(BraidNodeConfig::default())
}

pub fn cluster_with(config: BraidNodeConfig) -> TestCluster {
    let backends: Vec<Arc<MemoryStore>> = (0..6).map(|_| Arc::new(MemoryStore::new())).collect();
    let meta = Arc::new(MetaStore::in_memory());
    let dyn_backends: Vec<Arc<dyn BlobStore>> = backends
        .iter()
        .map(|b| b.clone() as Arc<dyn BlobStore>)
        .collect();
    let node = Arc::new(BraidNode::new(config, dyn_backends, meta.clone()).unwrap());
    TestCluster {
        node,
        backends,
        meta,
    }
}

impl TestCluster {
    /// Metadata rows of a file, sorted by shard index.
    pub fn rows(&self, filename: &str) -> Vec<ShardRecord> {
        self.meta.find_shards(OWNER, filename).unwrap()
    }

    /// Delete the blob backing shard `index` of `filename`.
    pub async fn delete_blob(&self, filename: &str, index: usize) {
        let rows = self.rows(filename);
        let record = rows.iter().find(|r| r.shard_index as usize == index).unwrap();
        self.backends[index].delete(&record.shard_name).await.unwrap();
    }

    /// Overwrite the blob backing shard `index` with same-length garbage.
    pub async fn corrupt_blob(&self, filename: &str, index: usize) {
        let rows = self.rows(filename);
        let record = rows.iter().find(|r| r.shard_index as usize == index).unwrap();
        let garbage = Bytes::from(vec![0xEEu8; record.shard_byte_size as usize]);
        self.backends[index].put(&record.shard_name, garbage).await.unwrap();
    }

    /// Whether the blob for shard `index` of `filename` exists.
    pub async fn blob_exists(&self, filename: &str, index: usize) -> bool {
        let rows = self.rows(filename);
        let Some(record) = rows.iter().find(|r| r.shard_index as usize == index) else {
            return false;
        };
        self.backends[index].exists(&record.shard_name).await.unwrap()
    }

    /// Total number of blobs across all backends.
    pub fn total_blobs(&self) -> usize {
        self.backends.iter().map(|b| b.len()).sum()
    }
}

/// Deterministic pseudo-random payload.
pub fn payload(len: usize) -> Bytes {
    let mut data = Vec::with_capacity(len);
    let mut state: u32 = 0xDEAD_BEEF;
    for _ in 0..len {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 16) as u8);
    }
    Bytes::from(data)
}

/// A short deadline configuration for timeout tests.
pub fn short_deadline_config(ms: u64) -> BraidNodeConfig {
    BraidNodeConfig {
        per_call_timeout: Duration::from_millis(ms),
        ..BraidNodeConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Fault injection
// ---------------------------------------------------------------------------

/// A [`BlobStore`] wrapper whose writes or reads can be switched to fail.
pub struct FailingStore {
    inner: Arc<dyn BlobStore>,
    pub fail_puts: AtomicBool,
    pub fail_gets: AtomicBool,
}

impl FailingStore {
    pub fn new(inner: Arc<dyn BlobStore>) -> Self {
        Self {
            inner,
            fail_puts: AtomicBool::new(false),
            fail_gets: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl BlobStore for FailingStore {
    async fn put(&self, name: &str, data: Bytes) -> Result<(), StoreError> {
        if self.fail_puts.load(Ordering::Relaxed) {
            return Err(StoreError::Backend {
                message: "injected put failure".to_string(),
            });
        }
        self.inner.put(name, data).await
    }

    async fn get(&self, name: &str) -> Result<Option<Bytes>, StoreError> {
        if self.fail_gets.load(Ordering::Relaxed) {
            return Err(StoreError::Backend {
                message: "injected get failure".to_string(),
            });
        }
        self.inner.get(name).await
    }

    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        self.inner.exists(name).await
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.inner.delete(name).await
    }
}
