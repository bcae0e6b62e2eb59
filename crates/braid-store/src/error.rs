//! Error types for blob storage operations.

/// Errors that can occur during blob storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An I/O error occurred talking to the backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend rejected the request.
    #[error("backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}
