//! File-based blob storage backend.
//!
//! Stores one file per blob directly under a base directory. Names are
//! flat and orchestrator-minted; anything that looks like a path is
//! rejected rather than resolved.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::BlobStore;

/// File-based blob store, one file per blob.
///
/// Writes are atomic: data is written to a temporary file first, then
/// renamed into place. This prevents half-written blobs from partial
/// writes.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a new file store rooted at the given directory.
    ///
    /// The directory is created if it does not exist.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Compute the file path for a blob name, rejecting path-like names.
    fn blob_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.is_empty() || name.contains(std::path::is_separator) || name == "." || name == ".."
        {
            return Err(StoreError::Backend {
                message: format!("invalid blob name: {name:?}"),
            });
        }
        Ok(self.base_dir.join(name))
    }
}

#[async_trait::async_trait]
impl BlobStore for FileStore {
    async fn put(&self, name: &str, data: Bytes) -> Result<(), StoreError> {
        let path = self.blob_path(name)?;

        // Atomic write: temp file in the same directory, then rename.
        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        debug!(name, path = %path.display(), size = data.len(), "stored blob to file");
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Bytes>, StoreError> {
        let path = self.blob_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.blob_path(name)?;
        match tokio::fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.blob_path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(name, "deleted blob file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let (_dir, store) = store();
        let data = Bytes::from_static(b"file shard content");
        store.put("doc.pdf.3.beef1234cafe", data.clone()).await.unwrap();
        assert_eq!(
            store.get("doc.pdf.3.beef1234cafe").await.unwrap(),
            Some(data)
        );
    }

    #[tokio::test]
    async fn test_get_nonexistent_returns_none() {
        let (_dir, store) = store();
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let (_dir, store) = store();
        store.put("k", Bytes::from_static(b"one")).await.unwrap();
        store.put("k", Bytes::from_static(b"twotwo")).await.unwrap();
        assert_eq!(
            store.get("k").await.unwrap(),
            Some(Bytes::from_static(b"twotwo"))
        );
    }

    #[tokio::test]
    async fn test_exists_and_delete_idempotent() {
        let (_dir, store) = store();
        assert!(!store.exists("k").await.unwrap());
        store.put("k", Bytes::from_static(b"v")).await.unwrap();
        assert!(store.exists("k").await.unwrap());
        store.delete("k").await.unwrap();
        assert!(!store.exists("k").await.unwrap());
        // Second delete is still a success.
        store.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_path_like_names_rejected() {
        let (_dir, store) = store();
        for name in ["../escape", "a/b", "", ".", ".."] {
            assert!(
                store.put(name, Bytes::from_static(b"x")).await.is_err(),
                "name {name:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_empty_blob() {
        let (_dir, store) = store();
        store.put("empty", Bytes::new()).await.unwrap();
        assert_eq!(store.get("empty").await.unwrap(), Some(Bytes::new()));
    }

    #[tokio::test]
    async fn test_no_tmp_file_left_behind() {
        let (dir, store) = store();
        store.put("blob", Bytes::from_static(b"data")).await.unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
