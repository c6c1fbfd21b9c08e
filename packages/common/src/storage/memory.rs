use std::collections::HashMap;
use std::io::Cursor;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::error::StorageError;
use super::traits::{BlobMeta, BlobStore, BoxReader, StoredBlob};
use crate::BlobId;

/// In-memory blob store.
///
/// Backs unit tests and exposes a store-call counter so callers can assert
/// how many store operations a code path performed.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<BlobId, (BlobMeta, Vec<u8>)>>,
    store_calls: AtomicU64,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently stored.
    pub fn blob_count(&self) -> usize {
        self.blobs.read().unwrap().len()
    }

    /// Total number of `store` invocations, successful or not.
    pub fn store_calls(&self) -> u64 {
        self.store_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(
        &self,
        data: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<StoredBlob, StorageError> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);

        let id = BlobId::generate();
        let meta = BlobMeta::for_payload(data, filename, content_type);
        self.blobs
            .write()
            .unwrap()
            .insert(id, (meta.clone(), data.to_vec()));
        Ok(StoredBlob { id, meta })
    }

    async fn fetch(&self, id: BlobId) -> Result<Vec<u8>, StorageError> {
        self.blobs
            .read()
            .unwrap()
            .get(&id)
            .map(|(_, data)| data.clone())
            .ok_or(StorageError::NotFound(id))
    }

    async fn fetch_stream(&self, id: BlobId) -> Result<BoxReader, StorageError> {
        let data = self.fetch(id).await?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn stat(&self, id: BlobId) -> Result<BlobMeta, StorageError> {
        self.blobs
            .read()
            .unwrap()
            .get(&id)
            .map(|(meta, _)| meta.clone())
            .ok_or(StorageError::NotFound(id))
    }

    async fn exists(&self, id: BlobId) -> Result<bool, StorageError> {
        Ok(self.blobs.read().unwrap().contains_key(&id))
    }

    async fn delete(&self, id: BlobId) -> Result<bool, StorageError> {
        Ok(self.blobs.write().unwrap().remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<BlobId>, StorageError> {
        Ok(self.blobs.read().unwrap().keys().copied().collect())
    }
}
