//! [`BraidNode`] — the orchestrator that ties all components together.
//!
//! A `BraidNode` owns the `n = k + m` backend adapters (one per logical
//! shard location), the metadata store, and the codec, and exposes the
//! upload / retrieve / list / delete pipeline.
//!
//! A stored file moves through these states:
//!
//! ```text
//! Absent -> Uploading -> Stored <-> Degraded -> Deleting -> Absent
//! ```
//!
//! `Uploading` and `Deleting` are transient; a failed upload is rolled
//! back to `Absent` by compensating deletes, and a `Degraded` file (at
//! most `m` shards lost or corrupted) is healed back to `Stored` by the
//! retrieval path. Losing more than `m` shards is not a state but a
//! terminal read error.

use std::sync::Arc;
use std::time::Duration;

use braid_erasure::ReedSolomon;
use braid_meta::MetaStore;
use braid_store::{BlobStore, StoreError};
use braid_types::{ErasureParams, FileSummary, OwnerId, ShardDigest, ShardRecord, unix_seconds};
use bytes::Bytes;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::engine::FileEngine;
use crate::error::EngineError;

/// Configuration for creating a [`BraidNode`].
#[derive(Debug, Clone)]
pub struct BraidNodeConfig {
    /// Erasure coding parameters (k data + m parity shards).
    pub erasure: ErasureParams,
    /// Deadline applied to every individual backend call. An expired
    /// deadline counts as a transient failure: the slot is absent for
    /// that attempt.
    pub per_call_timeout: Duration,
}

impl Default for BraidNodeConfig {
    fn default() -> Self {
        Self {
            erasure: ErasureParams::default(),
            per_call_timeout: Duration::from_secs(10),
        }
    }
}

/// The orchestrator that drives encode+upload, self-healing retrieval,
/// listing and deletion across the configured backends.
///
/// The backend table, metadata handle and codec are shared immutable
/// state; every operation fans out one task per shard, so one user
/// operation occupies exactly `n` workers.
pub struct BraidNode {
    /// `shard_index -> backend` table, fixed at startup.
    backends: Vec<Arc<dyn BlobStore>>,
    /// Shard metadata persistence.
    meta: Arc<MetaStore>,
    /// Erasure codec (stateless, reentrant).
    codec: ReedSolomon,
    /// Per-backend-call deadline.
    per_call_timeout: Duration,
}

impl std::fmt::Debug for BraidNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BraidNode")
            .field("backends_len", &self.backends.len())
            .field("per_call_timeout", &self.per_call_timeout)
            .finish()
    }
}

impl BraidNode {
    /// Create a new node.
    ///
    /// `backends` must contain exactly `k + m` entries; the list order
    /// defines the `shard_index -> location` mapping, which must not
    /// change across restarts while files are stored.
    pub fn new(
        config: BraidNodeConfig,
        backends: Vec<Arc<dyn BlobStore>>,
        meta: Arc<MetaStore>,
    ) -> Result<Self, EngineError> {
        let codec = ReedSolomon::new(
            config.erasure.data_shards as usize,
            config.erasure.parity_shards as usize,
        )?;
        if backends.len() != codec.total_shards() {
            return Err(EngineError::Config(format!(
                "need exactly {} backends (k + m), got {}",
                codec.total_shards(),
                backends.len()
            )));
        }
        Ok(Self {
            backends,
            meta,
            codec,
            per_call_timeout: config.per_call_timeout,
        })
    }

    /// Return a reference to the metadata store.
    pub fn meta(&self) -> &Arc<MetaStore> {
        &self.meta
    }

    // ------------------------------------------------------------------
    // Write path
    // ------------------------------------------------------------------

    /// Store a file: encode into `n` shards, then insert each metadata
    /// row and upload each blob in parallel. Any failure triggers
    /// compensating deletes of everything written so far.
    pub async fn upload_file(
        &self,
        owner: OwnerId,
        original_filename: &str,
        data: Bytes,
    ) -> Result<(), EngineError> {
        if original_filename.is_empty() {
            return Err(EngineError::InvalidFilename);
        }

        if !self.meta.find_shards(owner, original_filename)?.is_empty() {
            return Err(EngineError::AlreadyExists {
                filename: original_filename.to_string(),
            });
        }

        info!(
            %owner,
            file = original_filename,
            size = data.len(),
            "upload: encoding and storing"
        );

        let shards = self.codec.encode(&data);
        let shard_names: Vec<String> = (0..shards.len())
            .map(|i| mint_shard_name(original_filename, i))
            .collect();
        let created_at = unix_seconds();

        let mut tasks = JoinSet::new();
        for (index, shard) in shards.into_iter().enumerate() {
            let record = ShardRecord {
                owner_id: owner,
                original_filename: original_filename.to_string(),
                shard_name: shard_names[index].clone(),
                shard_index: index as u8,
                shard_sha256: ShardDigest::from_data(&shard),
                shard_byte_size: shard.len() as u64,
                original_file_size: data.len() as u64,
                created_at,
            };
            let meta = self.meta.clone();
            let backend = self.backends[index].clone();
            let deadline = self.per_call_timeout;
            tasks.spawn(async move {
                meta.insert_shard(&record)?;
                with_deadline(deadline, backend.put(&record.shard_name, shard)).await?;
                Ok::<(), EngineError>(())
            });
        }

        let mut first_failure: Option<String> = None;
        while let Some(res) = tasks.join_next().await {
            let outcome = res.unwrap_or_else(|e| {
                Err(EngineError::Config(format!("upload task panicked: {e}")))
            });
            if let Err(e) = outcome {
                warn!(%owner, file = original_filename, %e, "upload: shard task failed");
                first_failure.get_or_insert(e.to_string());
            }
        }

        if let Some(cause) = first_failure {
            self.rollback_upload(owner, &shard_names).await;
            return Err(EngineError::UploadFailed {
                filename: original_filename.to_string(),
                cause,
            });
        }

        info!(%owner, file = original_filename, "upload: complete");
        Ok(())
    }

    /// Best-effort removal of everything an aborted upload may have
    /// written: metadata rows first, then blobs.
    async fn rollback_upload(&self, owner: OwnerId, shard_names: &[String]) {
        for (index, shard_name) in shard_names.iter().enumerate() {
            if let Err(e) = self.meta.delete_shard(owner, shard_name) {
                warn!(%owner, shard = %shard_name, %e, "rollback: row delete failed");
            }
            let res = with_deadline(
                self.per_call_timeout,
                self.backends[index].delete(shard_name),
            )
            .await;
            if let Err(e) = res {
                warn!(%owner, shard = %shard_name, %e, "rollback: blob delete failed");
            }
        }
    }

    // ------------------------------------------------------------------
    // Read path (self-healing)
    // ------------------------------------------------------------------

    /// Reconstruct a file from its surviving shards.
    ///
    /// Every shard is downloaded in parallel and verified against its
    /// metadata digest; missing, failed or mismatching downloads become
    /// absent slots. With at least `k` present slots the file decodes;
    /// absent slots are then re-encoded and re-uploaded under fresh
    /// names. Heal failures never fail the read.
    pub async fn retrieve_file(
        &self,
        owner: OwnerId,
        original_filename: &str,
    ) -> Result<Vec<u8>, EngineError> {
        let records = self.meta.find_shards(owner, original_filename)?;
        if records.is_empty() {
            return Err(EngineError::NotFound {
                filename: original_filename.to_string(),
            });
        }

        let n = self.codec.total_shards();
        let k = self.codec.data_shards();
        let original_file_size = records[0].original_file_size as usize;

        // Old blob names per index, for the heal path's row replacement.
        let mut old_names: Vec<Option<String>> = vec![None; n];

        let mut tasks = JoinSet::new();
        for record in &records {
            let index = record.shard_index as usize;
            if index >= n {
                warn!(%owner, file = original_filename, index, "ignoring out-of-range shard row");
                continue;
            }
            old_names[index] = Some(record.shard_name.clone());

            let backend = self.backends[index].clone();
            let shard_name = record.shard_name.clone();
            let expected = record.shard_sha256;
            let deadline = self.per_call_timeout;
            tasks.spawn(async move {
                (
                    index,
                    fetch_verified(&*backend, &shard_name, expected, deadline).await,
                )
            });
        }

        let mut slots: Vec<Option<Bytes>> = vec![None; n];
        while let Some(res) = tasks.join_next().await {
            match res {
                Ok((index, slot)) => slots[index] = slot,
                Err(e) => warn!(%e, "retrieve: download task panicked"),
            }
        }

        let present = slots.iter().filter(|s| s.is_some()).count();
        if present < k {
            return Err(EngineError::Unrecoverable {
                filename: original_filename.to_string(),
                needed: k,
                found: present,
            });
        }

        let data = self.codec.decode(&slots, original_file_size)?;

        if present < n {
            info!(
                %owner,
                file = original_filename,
                present,
                missing = n - present,
                "retrieve: degraded read, healing missing shards"
            );
            self.heal(owner, original_filename, &data, &slots, &old_names)
                .await;
        }

        debug!(%owner, file = original_filename, size = data.len(), "retrieve: complete");
        Ok(data)
    }

    /// Re-create the shards for every absent slot: fresh blob name,
    /// replaced metadata row, re-uploaded blob. Failures are logged and
    /// left for the next retrieval to retry.
    async fn heal(
        &self,
        owner: OwnerId,
        original_filename: &str,
        data: &[u8],
        slots: &[Option<Bytes>],
        old_names: &[Option<String>],
    ) {
        // Re-encoding the reconstructed file yields the canonical shards
        // for every index, including the ones we never saw.
        let shards = self.codec.encode(data);
        let created_at = unix_seconds();

        let mut tasks = JoinSet::new();
        for (index, shard) in shards.into_iter().enumerate() {
            if slots[index].is_some() {
                continue;
            }
            let record = ShardRecord {
                owner_id: owner,
                original_filename: original_filename.to_string(),
                shard_name: mint_shard_name(original_filename, index),
                shard_index: index as u8,
                shard_sha256: ShardDigest::from_data(&shard),
                shard_byte_size: shard.len() as u64,
                original_file_size: data.len() as u64,
                created_at,
            };
            let old_name = old_names[index].clone();
            let meta = self.meta.clone();
            let backend = self.backends[index].clone();
            let deadline = self.per_call_timeout;
            tasks.spawn(async move {
                // Tolerates a row that is already gone.
                if let Some(old) = old_name {
                    meta.delete_shard(owner, &old)?;
                }
                meta.insert_shard(&record)?;
                with_deadline(deadline, backend.put(&record.shard_name, shard)).await?;
                info!(index, shard = %record.shard_name, "healed shard");
                Ok::<(), EngineError>(())
            });
        }

        while let Some(res) = tasks.join_next().await {
            match res {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(%owner, file = original_filename, %e, "heal failed, will retry on next access");
                }
                Err(e) => warn!(%e, "heal task panicked"),
            }
        }
    }

    // ------------------------------------------------------------------
    // Listing
    // ------------------------------------------------------------------

    /// One [`FileSummary`] per owned file. Existence probes run in
    /// parallel across shards of the same file and across files.
    pub async fn list_files(&self, owner: OwnerId) -> Result<Vec<FileSummary>, EngineError> {
        let representatives = self.meta.list_owned_filenames(owner)?;
        let shards_total = self.codec.total_shards() as u8;

        let mut tasks = JoinSet::new();
        for rep in representatives {
            let meta = self.meta.clone();
            let backends = self.backends.clone();
            let deadline = self.per_call_timeout;
            tasks.spawn(async move {
                let records = meta.find_shards(owner, &rep.original_filename)?;

                let mut probes = JoinSet::new();
                for record in records {
                    let index = record.shard_index as usize;
                    if index >= backends.len() {
                        continue;
                    }
                    let backend = backends[index].clone();
                    probes.spawn(async move {
                        with_deadline(deadline, backend.exists(&record.shard_name))
                            .await
                            .unwrap_or(false)
                    });
                }

                let mut retrievable = 0u8;
                while let Some(res) = probes.join_next().await {
                    if res.unwrap_or(false) {
                        retrievable += 1;
                    }
                }

                Ok::<FileSummary, EngineError>(FileSummary {
                    original_filename: rep.original_filename,
                    original_file_size: rep.original_file_size,
                    shards_total,
                    shards_retrievable: retrievable,
                })
            });
        }

        let mut summaries = Vec::new();
        while let Some(res) = tasks.join_next().await {
            match res {
                Ok(Ok(summary)) => summaries.push(summary),
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(EngineError::Config(format!("list task panicked: {e}"))),
            }
        }

        summaries.sort_by(|a, b| a.original_filename.cmp(&b.original_filename));
        Ok(summaries)
    }

    // ------------------------------------------------------------------
    // Delete path
    // ------------------------------------------------------------------

    /// Delete a file. Metadata rows are removed first — once they are
    /// gone the file is gone from the user's perspective, so a concurrent
    /// retrieval can never observe metadata without blobs mid-deletion.
    /// Blob removal is best-effort; leftovers are logged for janitorial
    /// cleanup.
    pub async fn delete_file(
        &self,
        owner: OwnerId,
        original_filename: &str,
    ) -> Result<(), EngineError> {
        let records = self.meta.find_shards(owner, original_filename)?;
        if records.is_empty() {
            return Err(EngineError::NotFound {
                filename: original_filename.to_string(),
            });
        }

        self.meta.delete_file(owner, original_filename)?;

        let mut tasks = JoinSet::new();
        for record in records {
            let index = record.shard_index as usize;
            if index >= self.backends.len() {
                continue;
            }
            let backend = self.backends[index].clone();
            let deadline = self.per_call_timeout;
            tasks.spawn(async move {
                if let Err(e) = with_deadline(deadline, backend.delete(&record.shard_name)).await {
                    warn!(shard = %record.shard_name, %e, "delete: blob removal failed, leaving for cleanup");
                }
            });
        }
        while tasks.join_next().await.is_some() {}

        info!(%owner, file = original_filename, "delete: complete");
        Ok(())
    }
}

#[async_trait::async_trait]
impl FileEngine for BraidNode {
    async fn upload(
        &self,
        owner: OwnerId,
        original_filename: &str,
        data: Bytes,
    ) -> Result<(), EngineError> {
        self.upload_file(owner, original_filename, data).await
    }

    async fn retrieve(
        &self,
        owner: OwnerId,
        original_filename: &str,
    ) -> Result<Vec<u8>, EngineError> {
        self.retrieve_file(owner, original_filename).await
    }

    async fn list(&self, owner: OwnerId) -> Result<Vec<FileSummary>, EngineError> {
        self.list_files(owner).await
    }

    async fn delete(&self, owner: OwnerId, original_filename: &str) -> Result<(), EngineError> {
        self.delete_file(owner, original_filename).await
    }
}

/// Apply the per-call deadline to a backend future. An expired deadline
/// is reported as a backend error so callers treat it like any other
/// transient failure.
async fn with_deadline<T>(
    deadline: Duration,
    fut: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(res) => res,
        Err(_) => Err(StoreError::Backend {
            message: format!("deadline of {deadline:?} exceeded"),
        }),
    }
}

/// Download one shard and verify it against its metadata digest.
/// Anything short of a byte-perfect blob yields an absent slot.
async fn fetch_verified(
    backend: &dyn BlobStore,
    shard_name: &str,
    expected: ShardDigest,
    deadline: Duration,
) -> Option<Bytes> {
    match with_deadline(deadline, backend.get(shard_name)).await {
        Ok(Some(bytes)) => {
            let actual = ShardDigest::from_data(&bytes);
            if actual == expected {
                Some(bytes)
            } else {
                warn!(
                    shard = shard_name,
                    %expected,
                    %actual,
                    "shard digest mismatch, treating as absent"
                );
                None
            }
        }
        Ok(None) => {
            debug!(shard = shard_name, "shard blob missing");
            None
        }
        Err(e) => {
            warn!(shard = shard_name, %e, "shard download failed, treating as absent");
            None
        }
    }
}

/// Mint a fresh, collision-free blob key for one shard.
///
/// Not content-addressed: the random suffix is what lets a heal write
/// supersede the old row without colliding with it.
fn mint_shard_name(original_filename: &str, index: usize) -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 6];
    rand::rng().fill_bytes(&mut bytes);
    let suffix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{original_filename}.{index}.{suffix}")
}
