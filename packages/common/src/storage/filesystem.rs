use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::traits::{BlobMeta, BlobStore, BoxReader, StoredBlob};
use crate::BlobId;

/// Filesystem-backed blob store.
///
/// Each blob lives under a Git-style sharded directory layout:
/// `{root}/{first 2 hex chars of the id}/{remaining 30 chars}` for the
/// content, with a `.meta` JSON sidecar next to it. Writes are staged in
/// `{root}/.tmp` and renamed into place, so a blob is either fully
/// observable or not at all.
pub struct FilesystemBlobStore {
    root: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    pub async fn new(root: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        fs::create_dir_all(root.join(".tmp")).await?;
        Ok(Self { root, max_size })
    }

    fn shard_parts(id: BlobId) -> (String, String) {
        let hex = id.as_uuid().simple().to_string();
        (hex[..2].to_string(), hex[2..].to_string())
    }

    fn data_path(&self, id: BlobId) -> PathBuf {
        let (shard, name) = Self::shard_parts(id);
        self.root.join(shard).join(name)
    }

    fn meta_path(&self, id: BlobId) -> PathBuf {
        let (shard, name) = Self::shard_parts(id);
        self.root.join(shard).join(format!("{name}.meta"))
    }

    /// Path for a staging file during writes.
    fn temp_path(&self) -> PathBuf {
        self.root.join(".tmp").join(uuid::Uuid::new_v4().to_string())
    }

    /// Reassemble a blob id from its shard directory and file name.
    fn id_from_parts(shard: &str, name: &str) -> Option<BlobId> {
        format!("{shard}{name}").parse().ok()
    }

    async fn write_staged(&self, contents: &[u8], dest: &PathBuf) -> std::io::Result<()> {
        let staging = self.temp_path();
        if let Err(e) = fs::write(&staging, contents).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e);
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        if let Err(e) = fs::rename(&staging, dest).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn store(
        &self,
        data: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<StoredBlob, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let id = BlobId::generate();
        let meta = BlobMeta::for_payload(data, filename, content_type);

        let meta_bytes = serde_json::to_vec(&meta).map_err(|e| StorageError::Store {
            filename: filename.to_string(),
            source: std::io::Error::other(e),
        })?;

        // Sidecar first: a meta file without data is invisible (existence is
        // keyed on the data file), while data without meta would be corrupt.
        let store_err = |source| StorageError::Store {
            filename: filename.to_string(),
            source,
        };
        self.write_staged(&meta_bytes, &self.meta_path(id))
            .await
            .map_err(store_err)?;

        if let Err(e) = self.write_staged(data, &self.data_path(id)).await {
            let _ = fs::remove_file(self.meta_path(id)).await;
            return Err(store_err(e));
        }

        Ok(StoredBlob { id, meta })
    }

    async fn fetch(&self, id: BlobId) -> Result<Vec<u8>, StorageError> {
        match fs::read(self.data_path(id)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch_stream(&self, id: BlobId) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.data_path(id)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn stat(&self, id: BlobId) -> Result<BlobMeta, StorageError> {
        if !fs::try_exists(self.data_path(id)).await? {
            return Err(StorageError::NotFound(id));
        }
        let bytes = match fs::read(self.meta_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::Corrupt {
                    id,
                    detail: "metadata sidecar missing".into(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
            id,
            detail: e.to_string(),
        })
    }

    async fn exists(&self, id: BlobId) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.data_path(id)).await?)
    }

    async fn delete(&self, id: BlobId) -> Result<bool, StorageError> {
        match fs::remove_file(self.data_path(id)).await {
            Ok(()) => {
                let _ = fs::remove_file(self.meta_path(id)).await;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<BlobId>, StorageError> {
        let mut ids = Vec::new();
        let mut shards = fs::read_dir(&self.root).await?;
        while let Some(shard) = shards.next_entry().await? {
            let shard_name = shard.file_name();
            let Some(shard_name) = shard_name.to_str() else {
                continue;
            };
            if shard_name == ".tmp" || !shard.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(shard.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                if name.ends_with(".meta") {
                    continue;
                }
                match Self::id_from_parts(shard_name, name) {
                    Some(id) => ids.push(id),
                    None => {
                        tracing::warn!("ignoring unrecognized entry in blob root: {name}");
                    }
                }
            }
        }
        Ok(ids)
    }
}
