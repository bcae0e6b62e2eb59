//! A [`BlobStore`] wrapper that adds configurable random IO latency.
//!
//! `SlowStore` wraps any `Arc<dyn BlobStore>` and sleeps for a random
//! duration before each read or write operation. The RNG is seeded for
//! deterministic, reproducible behaviour across test runs.
//!
//! # Example
//!
//! ```ignore
//! let slow = SlowStore::new(inner)
//!     .read_latency(5, 20)    // 5-20 ms per read
//!     .write_latency(10, 30)  // 10-30 ms per write
//!     .seed(42);
//! ```

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::StoreError;
use crate::traits::BlobStore;

/// A [`BlobStore`] wrapper that injects random latency before IO
/// operations.
///
/// Useful for exercising per-call deadlines and the delete-metadata-first
/// ordering, which don't surface with an instant in-memory store.
pub struct SlowStore {
    inner: Arc<dyn BlobStore>,
    read_latency_ms: (u64, u64),
    write_latency_ms: (u64, u64),
    rng: Mutex<StdRng>,
}

impl SlowStore {
    /// Wrap an existing store with zero latency (pass-through) by default.
    pub fn new(inner: Arc<dyn BlobStore>) -> Self {
        Self {
            inner,
            read_latency_ms: (0, 0),
            write_latency_ms: (0, 0),
            rng: Mutex::new(StdRng::seed_from_u64(0)),
        }
    }

    /// Set the read latency range in milliseconds (uniform random).
    pub fn read_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.read_latency_ms = (min_ms, max_ms);
        self
    }

    /// Set the write latency range in milliseconds (uniform random).
    ///
    /// Applies to `put` and `delete`.
    pub fn write_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.write_latency_ms = (min_ms, max_ms);
        self
    }

    /// Set the RNG seed for deterministic behaviour.
    pub fn seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// Sleep for a random duration in `[min, max]` milliseconds.
    async fn delay(&self, range: (u64, u64)) {
        let (min, max) = range;

        if max == 0 {
            return;
        }

        let ms = if min == max {
            min
        } else {
            self.rng.lock().expect("lock poisoned").random_range(min..=max)
        };

        if ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(ms)).await;
        }
    }
}

#[async_trait::async_trait]
impl BlobStore for SlowStore {
    async fn put(&self, name: &str, data: Bytes) -> Result<(), StoreError> {
        self.delay(self.write_latency_ms).await;
        self.inner.put(name, data).await
    }

    async fn get(&self, name: &str) -> Result<Option<Bytes>, StoreError> {
        self.delay(self.read_latency_ms).await;
        self.inner.get(name).await
    }

    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        self.delay(self.read_latency_ms).await;
        self.inner.exists(name).await
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.delay(self.write_latency_ms).await;
        self.inner.delete(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;

    #[tokio::test]
    async fn test_passthrough_semantics() {
        let slow = SlowStore::new(Arc::new(MemoryStore::new()));
        let data = Bytes::from_static(b"through the wrapper");
        slow.put("k", data.clone()).await.unwrap();
        assert_eq!(slow.get("k").await.unwrap(), Some(data));
        assert!(slow.exists("k").await.unwrap());
        slow.delete("k").await.unwrap();
        assert!(!slow.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_latency_applied() {
        let slow = SlowStore::new(Arc::new(MemoryStore::new()))
            .read_latency(30, 30)
            .seed(1);
        let start = std::time::Instant::now();
        let _ = slow.get("k").await.unwrap();
        assert!(start.elapsed() >= std::time::Duration::from_millis(25));
    }
}
