use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncRead;

use super::error::StorageError;
use crate::BlobId;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Metadata recorded alongside a stored blob.
///
/// Immutable once the blob is stored, like the bytes themselves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMeta {
    /// Original upload filename.
    pub filename: String,
    /// MIME content type.
    pub content_type: String,
    /// Byte length of the stored content.
    pub size: u64,
    /// Lowercase hex SHA-256 digest of the content. Used for ETag caching.
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

impl BlobMeta {
    /// Build the metadata record for `data`, computing its checksum.
    pub fn for_payload(data: &[u8], filename: &str, content_type: &str) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size: data.len() as u64,
            checksum: hex::encode(Sha256::digest(data)),
            created_at: Utc::now(),
        }
    }
}

/// A freshly stored blob: the reference the store assigned plus the
/// metadata it recorded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredBlob {
    pub id: BlobId,
    pub meta: BlobMeta,
}

/// Durable, content-agnostic storage of one file at a time.
///
/// A `store` call is atomic per blob: either the full byte stream is
/// durably written and a reference returned, or nothing observable is
/// written and an error is returned. Blobs are independent once stored,
/// so implementations need no cross-blob locking.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` and return the assigned reference.
    ///
    /// Empty payloads are permitted; the non-empty constraint lives at the
    /// collection level, not here. Failures carry the filename that failed.
    async fn store(
        &self,
        data: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<StoredBlob, StorageError>;

    /// Retrieve all bytes of a blob.
    async fn fetch(&self, id: BlobId) -> Result<Vec<u8>, StorageError>;

    /// Retrieve a blob as a streaming async reader.
    async fn fetch_stream(&self, id: BlobId) -> Result<BoxReader, StorageError>;

    /// Retrieve a blob's metadata without its content.
    async fn stat(&self, id: BlobId) -> Result<BlobMeta, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, id: BlobId) -> Result<bool, StorageError>;

    /// Delete a blob entirely (no soft-delete at this layer).
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, id: BlobId) -> Result<bool, StorageError>;

    /// List every stored blob reference. Used by the orphan sweep.
    async fn list(&self) -> Result<Vec<BlobId>, StorageError>;
}
