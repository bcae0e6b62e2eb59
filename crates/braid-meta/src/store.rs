//! [`MetaStore`] implementation with Fjall (disk) and in-memory backends.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, RwLock};

use braid_types::{OwnerId, ShardRecord};
use fjall::{Database, Keyspace, KeyspaceCreateOptions};
use tracing::debug;

use crate::MetaError;

type Result<T> = std::result::Result<T, MetaError>;

/// Inner backend: either Fjall-backed (disk) or pure in-memory.
enum Backend {
    Fjall {
        #[allow(dead_code)]
        db: Database,
        /// Row key (owner ++ filename ++ index) -> postcard [`ShardRecord`].
        shards: Keyspace,
        /// Name key (owner ++ shard_name) -> row key, the unique-name index.
        names: Keyspace,
    },
    Memory(Box<MemoryBackend>),
}

/// Pure in-memory storage for zero disk I/O mode.
struct MemoryBackend {
    /// Row key -> postcard [`ShardRecord`]. BTreeMap keeps rows in key
    /// order so prefix scans come out sorted like the Fjall backend.
    shards: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    /// Name key -> row key.
    names: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

/// Metadata store holding one row per stored shard.
///
/// Uniqueness: the row key `(owner, original_filename, shard_index)` and
/// the name key `(owner, shard_name)` are both enforced on insert; a
/// conflict on either fails the insert, which is what serialises
/// concurrent uploads of the same filename.
pub struct MetaStore {
    backend: Backend,
    /// Serialises check-and-insert for the Fjall backend: its keyspaces
    /// offer no multi-call atomicity, so the uniqueness probe and the
    /// two writes must not interleave across writers.
    write_lock: Mutex<()>,
}

impl MetaStore {
    /// Open a persistent MetaStore at the given path (Fjall backend).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::builder(path).open()?;
        let backend = Self::init_fjall(db)?;
        Ok(Self {
            backend,
            write_lock: Mutex::new(()),
        })
    }

    /// Open a temporary MetaStore backed by Fjall (cleaned up on drop).
    ///
    /// Still uses disk I/O (tempdir). For zero disk I/O, use
    /// [`in_memory`](Self::in_memory).
    pub fn open_temporary() -> Result<Self> {
        let tmp = tempfile::tempdir().map_err(std::io::Error::other)?;
        let db = Database::builder(tmp.path()).temporary(true).open()?;
        let backend = Self::init_fjall(db)?;
        Ok(Self {
            backend,
            write_lock: Mutex::new(()),
        })
    }

    /// Create a pure in-memory MetaStore. Zero disk I/O.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Box::new(MemoryBackend {
                shards: RwLock::new(BTreeMap::new()),
                names: RwLock::new(HashMap::new()),
            })),
            write_lock: Mutex::new(()),
        }
    }

    fn init_fjall(db: Database) -> Result<Backend> {
        let shards = db.keyspace("shards", KeyspaceCreateOptions::default)?;
        let names = db.keyspace("names", KeyspaceCreateOptions::default)?;
        Ok(Backend::Fjall { db, shards, names })
    }

    // ----- Writes -----

    /// Insert one shard row. Fails with [`MetaError::DuplicateShard`] when
    /// a row with the same `(owner, original_filename, shard_index)` or
    /// the same `(owner, shard_name)` already exists.
    pub fn insert_shard(&self, record: &ShardRecord) -> Result<()> {
        let row_key = row_key(
            record.owner_id,
            &record.original_filename,
            record.shard_index,
        );
        let name_key = name_key(record.owner_id, &record.shard_name);
        let value = postcard::to_allocvec(record)?;

        match &self.backend {
            Backend::Fjall { shards, names, .. } => {
                // Hold the write lock across the probe and both inserts,
                // like the memory branch holds its map locks. Without it
                // two racing inserts of the same keys could both pass the
                // emptiness check and silently overwrite each other.
                let _guard = self.write_lock.lock().expect("lock poisoned");
                if shards.get(row_key.as_slice())?.is_some()
                    || names.get(name_key.as_slice())?.is_some()
                {
                    return Err(MetaError::DuplicateShard {
                        shard_name: record.shard_name.clone(),
                        shard_index: record.shard_index,
                    });
                }
                shards.insert(row_key.as_slice(), value.as_slice())?;
                names.insert(name_key.as_slice(), row_key.as_slice())?;
            }
            Backend::Memory(m) => {
                let mut rows = m.shards.write().expect("lock poisoned");
                let mut names = m.names.write().expect("lock poisoned");
                if rows.contains_key(&row_key) || names.contains_key(&name_key) {
                    return Err(MetaError::DuplicateShard {
                        shard_name: record.shard_name.clone(),
                        shard_index: record.shard_index,
                    });
                }
                rows.insert(row_key.clone(), value);
                names.insert(name_key, row_key);
            }
        }

        debug!(
            owner = %record.owner_id,
            file = %record.original_filename,
            index = record.shard_index,
            shard = %record.shard_name,
            "inserted shard row"
        );
        Ok(())
    }

    /// Remove all rows of one file. Idempotent.
    pub fn delete_file(&self, owner: OwnerId, original_filename: &str) -> Result<()> {
        let records = self.find_shards(owner, original_filename)?;
        for record in &records {
            self.remove_row(record)?;
        }
        if !records.is_empty() {
            debug!(owner = %owner, file = original_filename, rows = records.len(), "deleted file rows");
        }
        Ok(())
    }

    /// Remove a single row by its unique `(owner, shard_name)` key.
    /// Idempotent: removing an absent row is a success.
    pub fn delete_shard(&self, owner: OwnerId, shard_name: &str) -> Result<()> {
        let name_key = name_key(owner, shard_name);

        let row_key = match &self.backend {
            Backend::Fjall { names, .. } => names.get(name_key.as_slice())?.map(|v| v[..].to_vec()),
            Backend::Memory(m) => m
                .names
                .read()
                .expect("lock poisoned")
                .get(&name_key)
                .cloned(),
        };

        let Some(row_key) = row_key else {
            return Ok(());
        };

        match &self.backend {
            Backend::Fjall { shards, names, .. } => {
                shards.remove(row_key.as_slice())?;
                names.remove(name_key.as_slice())?;
            }
            Backend::Memory(m) => {
                m.shards.write().expect("lock poisoned").remove(&row_key);
                m.names.write().expect("lock poisoned").remove(&name_key);
            }
        }

        debug!(owner = %owner, shard = shard_name, "deleted shard row");
        Ok(())
    }

    fn remove_row(&self, record: &ShardRecord) -> Result<()> {
        let row_key = row_key(
            record.owner_id,
            &record.original_filename,
            record.shard_index,
        );
        let name_key = name_key(record.owner_id, &record.shard_name);
        match &self.backend {
            Backend::Fjall { shards, names, .. } => {
                shards.remove(row_key.as_slice())?;
                names.remove(name_key.as_slice())?;
            }
            Backend::Memory(m) => {
                m.shards.write().expect("lock poisoned").remove(&row_key);
                m.names.write().expect("lock poisoned").remove(&name_key);
            }
        }
        Ok(())
    }

    // ----- Queries -----

    /// All rows of one file, sorted by `shard_index` ascending.
    ///
    /// Returns an empty vector when the file does not exist. The sort
    /// order is guaranteed regardless of insertion order — callers align
    /// the rows positionally with codec slots.
    pub fn find_shards(&self, owner: OwnerId, original_filename: &str) -> Result<Vec<ShardRecord>> {
        let prefix = file_prefix(owner, original_filename);
        self.scan_prefix(&prefix)
    }

    /// One representative row per distinct `original_filename` owned by
    /// `owner`, in row-key order.
    pub fn list_owned_filenames(&self, owner: OwnerId) -> Result<Vec<ShardRecord>> {
        let rows = self.scan_prefix(&owner_prefix(owner))?;
        let mut out: Vec<ShardRecord> = Vec::new();
        for record in rows {
            // Rows of one file are contiguous in key order.
            if out.last().map(|r: &ShardRecord| r.original_filename.as_str())
                != Some(record.original_filename.as_str())
            {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Total number of shard rows across all owners.
    pub fn count_shard_rows(&self) -> Result<usize> {
        match &self.backend {
            Backend::Fjall { shards, .. } => {
                let mut count = 0;
                for guard in shards.iter() {
                    let _ = guard.key()?;
                    count += 1;
                }
                Ok(count)
            }
            Backend::Memory(m) => Ok(m.shards.read().expect("lock poisoned").len()),
        }
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<ShardRecord>> {
        match &self.backend {
            Backend::Fjall { shards, .. } => {
                let mut out = Vec::new();
                for guard in shards.prefix(prefix) {
                    let value = guard.value()?;
                    out.push(postcard::from_bytes(&value)?);
                }
                Ok(out)
            }
            Backend::Memory(m) => {
                let rows = m.shards.read().expect("lock poisoned");
                let mut out = Vec::new();
                for (key, value) in rows.range(prefix.to_vec()..) {
                    if !key.starts_with(prefix) {
                        break;
                    }
                    out.push(postcard::from_bytes(value)?);
                }
                Ok(out)
            }
        }
    }
}

/// Row key: `owner (8 bytes BE) ++ filename_len (2 bytes BE) ++ filename ++ index`.
///
/// The length prefix makes the per-file prefix unambiguous even for
/// filenames that contain other filenames as prefixes, and the trailing
/// index byte makes lexicographic order equal ascending `shard_index`.
fn row_key(owner: OwnerId, original_filename: &str, index: u8) -> Vec<u8> {
    let mut key = file_prefix(owner, original_filename);
    key.push(index);
    key
}

/// Prefix covering all rows of one file.
fn file_prefix(owner: OwnerId, original_filename: &str) -> Vec<u8> {
    let name = original_filename.as_bytes();
    let mut key = Vec::with_capacity(10 + name.len());
    key.extend_from_slice(&owner.as_u64().to_be_bytes());
    key.extend_from_slice(&(name.len() as u16).to_be_bytes());
    key.extend_from_slice(name);
    key
}

/// Prefix covering all rows of one owner.
fn owner_prefix(owner: OwnerId) -> Vec<u8> {
    owner.as_u64().to_be_bytes().to_vec()
}

/// Name key: `owner (8 bytes BE) ++ shard_name`, the unique blob-key index.
fn name_key(owner: OwnerId, shard_name: &str) -> Vec<u8> {
    let name = shard_name.as_bytes();
    let mut key = Vec::with_capacity(8 + name.len());
    key.extend_from_slice(&owner.as_u64().to_be_bytes());
    key.extend_from_slice(name);
    key
}
