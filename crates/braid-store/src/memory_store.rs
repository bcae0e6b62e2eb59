//! In-memory blob storage backend.

use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::BlobStore;

/// In-memory blob store backed by a `RwLock<HashMap>`.
///
/// Useful for testing and for single-process deployments that trade
/// durability for speed.
#[derive(Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Whether the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryStore {
    async fn put(&self, name: &str, data: Bytes) -> Result<(), StoreError> {
        debug!(name, size = data.len(), "storing blob in memory");
        let mut map = self.blobs.write().expect("lock poisoned");
        map.insert(name.to_string(), data);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Bytes>, StoreError> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.get(name).cloned())
    }

    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.contains_key(name))
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut map = self.blobs.write().expect("lock poisoned");
        if map.remove(name).is_some() {
            debug!(name, "deleted blob from memory");
        }
        Ok(())
    }
}
