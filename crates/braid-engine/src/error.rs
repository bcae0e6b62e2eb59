//! Error types for the orchestrator.

/// Errors that can occur during file operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Failed to access the metadata store.
    #[error("metadata error: {0}")]
    Meta(#[from] braid_meta::MetaError),

    /// Failed to access a blob backend.
    #[error("store error: {0}")]
    Store(#[from] braid_store::StoreError),

    /// Erasure coding error.
    #[error("codec error: {0}")]
    Codec(#[from] braid_erasure::CodecError),

    /// The node was constructed with inconsistent configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The caller supplied an unusable filename.
    #[error("invalid filename")]
    InvalidFilename,

    /// An upload collided with an existing file of the same name.
    #[error("file already exists: {filename}")]
    AlreadyExists {
        /// The colliding filename.
        filename: String,
    },

    /// No such file for this owner.
    #[error("file not found: {filename}")]
    NotFound {
        /// The requested filename.
        filename: String,
    },

    /// Too few shards survived to reconstruct the file.
    #[error("file {filename} unrecoverable: need {needed} shards, found {found}")]
    Unrecoverable {
        /// The requested filename.
        filename: String,
        /// Shards required for reconstruction (k).
        needed: usize,
        /// Shards that passed download and digest verification.
        found: usize,
    },

    /// A mid-upload failure; compensating deletes have been executed.
    #[error("upload of {filename} failed: {cause}")]
    UploadFailed {
        /// The filename whose upload failed.
        filename: String,
        /// The first underlying failure.
        cause: String,
    },
}
