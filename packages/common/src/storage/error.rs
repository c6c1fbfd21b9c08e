use thiserror::Error;

use crate::BlobId;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(BlobId),

    /// An I/O failure while storing `filename`. Nothing was written.
    #[error("failed to store '{filename}': {source}")]
    Store {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error outside of a store operation.
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The blob exceeds the configured size limit.
    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },

    /// A blob's metadata record is present but unreadable.
    #[error("corrupt blob metadata for {id}: {detail}")]
    Corrupt { id: BlobId, detail: String },
}
