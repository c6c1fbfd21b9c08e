use std::sync::Arc;

use chrono::Utc;
use common::storage::{BlobStore, StorageError, StoredBlob};
use common::{BlobId, MeshId, UserId};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::catalog::{Catalog, CatalogError};
use crate::entity::{FileCollection, FilePayload, Mesh, MeshState};

/// Failure of the batch save protocol. No file collection is observable in
/// any of these cases.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The upload contained no files. Client input error; no blob-store
    /// call was made.
    #[error("no mesh files detected")]
    EmptyUpload,

    /// Storing one file failed. The `stored` blobs written before it are
    /// now orphaned, awaiting the sweep.
    #[error("failed to store '{filename}' (file {} of {total}; {stored} already stored): {source}", stored + 1)]
    Store {
        filename: String,
        stored: usize,
        total: usize,
        #[source]
        source: StorageError,
    },

    /// Every blob was stored but the collection record could not be
    /// persisted; all listed blobs are now orphaned.
    #[error("unable to save file collection ({} blobs orphaned): {source}", orphaned.len())]
    Persist {
        orphaned: Vec<BlobId>,
        #[source]
        source: CatalogError,
    },
}

/// Failure of mesh creation.
#[derive(Debug, Error)]
pub enum CreateError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Client input error: the chosen name is taken.
    #[error("a mesh with name '{0}' already exists")]
    DuplicateName(String),

    /// The mesh record could not be persisted. The collection and its
    /// blobs are now orphaned, awaiting the sweep.
    #[error("unable to create mesh: {0}")]
    Persist(#[source] CatalogError),
}

/// Failure of an owner-scoped lookup.
#[derive(Debug, Error)]
pub enum GetError {
    #[error("mesh {0} does not exist")]
    NotFound(MeshId),

    /// The requester is not the owner. Only ever reported for meshes that
    /// do exist; existence is checked first.
    #[error("user {user} is not authorized to interact with mesh {mesh}")]
    Unauthorized { mesh: MeshId, user: UserId },

    #[error(transparent)]
    Catalog(CatalogError),
}

/// Failure of a metadata update or delete.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Get(#[from] GetError),

    #[error("a mesh with name '{0}' already exists")]
    DuplicateName(String),

    /// Another write landed between read and update.
    #[error("mesh was modified concurrently, retry")]
    Conflict,

    #[error(transparent)]
    Catalog(CatalogError),
}

/// Metadata fields a mesh owner may change after creation.
#[derive(Clone, Debug, Default)]
pub struct MeshPatch {
    pub name: Option<String>,
    pub short_desc: Option<String>,
    pub long_desc: Option<String>,
}

/// The mesh aggregate: owns the batch save protocol and every lifecycle
/// operation that depends on it.
#[derive(Clone)]
pub struct MeshService {
    store: Arc<dyn BlobStore>,
    catalog: Arc<dyn Catalog>,
}

impl MeshService {
    pub fn new(store: Arc<dyn BlobStore>, catalog: Arc<dyn Catalog>) -> Self {
        Self { store, catalog }
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Persist an upload batch as one file collection.
    ///
    /// Blobs are stored strictly sequentially, in input order, stopping at
    /// the first failure so no further blobs become orphaned. The
    /// collection record is written only after every blob exists
    /// (batch-or-nothing); a collection never references a blob that does
    /// not exist.
    pub async fn save_files(&self, payloads: &[FilePayload]) -> Result<FileCollection, UploadError> {
        info!("attempting to save {} mesh files", payloads.len());

        if payloads.is_empty() {
            warn!("attempted to upload a mesh without any files");
            return Err(UploadError::EmptyUpload);
        }

        let mut stored: Vec<StoredBlob> = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let blob = self
                .store
                .store(&payload.bytes, &payload.filename, &payload.content_type)
                .await
                .map_err(|source| {
                    error!(
                        filename = %payload.filename,
                        stored = stored.len(),
                        "unable to store mesh file: {source}"
                    );
                    UploadError::Store {
                        filename: payload.filename.clone(),
                        stored: stored.len(),
                        total: payloads.len(),
                        source,
                    }
                })?;
            stored.push(blob);
        }

        let collection = FileCollection::assemble(&stored);
        if let Err(source) = self.catalog.insert_collection(collection.clone()).await {
            let orphaned: Vec<BlobId> = stored.iter().map(|blob| blob.id).collect();
            error!(
                "unable to save file collection, {} blobs orphaned: {source}",
                orphaned.len()
            );
            return Err(UploadError::Persist { orphaned, source });
        }

        info!(collection = %collection.id, "saved mesh file collection");
        Ok(collection)
    }

    /// Create a mesh from an upload batch.
    ///
    /// The file collection is saved first; any failure there propagates
    /// unchanged and no mesh is created.
    pub async fn create_mesh(
        &self,
        owner: UserId,
        name: String,
        short_desc: String,
        long_desc: String,
        payloads: &[FilePayload],
    ) -> Result<Mesh, CreateError> {
        info!(%owner, name = %name, "creating new mesh");

        let collection = self.save_files(payloads).await?;

        let mesh = Mesh::new(owner, name, short_desc, long_desc, collection.id);
        match self.catalog.insert_mesh(mesh.clone()).await {
            Ok(()) => {
                info!(mesh = %mesh.id, %owner, "created mesh");
                Ok(mesh)
            }
            Err(CatalogError::DuplicateName(name)) => {
                error!(
                    %owner,
                    "attempted to create a mesh with name '{name}' but a mesh by that name already exists"
                );
                Err(CreateError::DuplicateName(name))
            }
            Err(source) => {
                error!("error while creating mesh: {source}");
                Err(CreateError::Persist(source))
            }
        }
    }

    /// Set a mesh's lifecycle state.
    ///
    /// Every state is reachable from every state. A transition to the
    /// current state is an idempotent success that writes nothing. Returns
    /// whether the transition was applied; `false` only on a persistence
    /// failure (including losing the version gate), never on an "invalid"
    /// target state.
    pub async fn update_state(&self, mesh: &Mesh, new_state: MeshState) -> bool {
        info!(
            mesh = %mesh.id,
            name = %mesh.name,
            "updating state from {} to {new_state}",
            mesh.state
        );

        if mesh.state == new_state {
            info!(mesh = %mesh.id, "mesh already has state {new_state}, not updating");
            return true;
        }

        let mut changed = mesh.clone();
        changed.state = new_state;
        match self.catalog.update_mesh(&changed).await {
            Ok(_) => {
                info!(mesh = %mesh.id, "updated state to {new_state}");
                true
            }
            Err(err) => {
                warn!(mesh = %mesh.id, "unable to update state to {new_state}: {err}");
                false
            }
        }
    }

    /// Fetch a mesh by id on behalf of `user`.
    ///
    /// Existence is checked before authorization, so a missing id never
    /// leaks as an authorization failure. A successful read records the
    /// access time.
    pub async fn get(&self, user: UserId, id: MeshId) -> Result<Mesh, GetError> {
        let mut mesh = match self.catalog.get_mesh(id).await {
            Ok(mesh) => mesh,
            Err(CatalogError::MeshNotFound(_)) => {
                error!(%user, "mesh {id} does not exist");
                return Err(GetError::NotFound(id));
            }
            Err(err) => return Err(GetError::Catalog(err)),
        };

        if !mesh.is_authorized(user) {
            error!(%user, "user is not authorized to interact with mesh {id}");
            return Err(GetError::Unauthorized { mesh: id, user });
        }

        let now = Utc::now();
        if let Err(err) = self.catalog.touch_mesh(id, now).await {
            // Access-time bookkeeping never fails a read.
            warn!(mesh = %id, "unable to record access time: {err}");
        } else {
            mesh.last_accessed = now;
        }

        Ok(mesh)
    }

    /// All meshes owned by `user`.
    pub async fn list(&self, user: UserId) -> Result<Vec<Mesh>, GetError> {
        self.catalog
            .list_meshes(user)
            .await
            .map_err(GetError::Catalog)
    }

    /// Patch a mesh's descriptive metadata (name, descriptions).
    pub async fn update_mesh(
        &self,
        user: UserId,
        id: MeshId,
        patch: MeshPatch,
    ) -> Result<Mesh, UpdateError> {
        let mut mesh = self.get(user, id).await?;

        if let Some(name) = patch.name {
            mesh.name = name;
        }
        if let Some(short_desc) = patch.short_desc {
            mesh.short_desc = short_desc;
        }
        if let Some(long_desc) = patch.long_desc {
            mesh.long_desc = long_desc;
        }

        match self.catalog.update_mesh(&mesh).await {
            Ok(updated) => Ok(updated),
            Err(CatalogError::DuplicateName(name)) => Err(UpdateError::DuplicateName(name)),
            Err(CatalogError::VersionConflict { .. }) => Err(UpdateError::Conflict),
            Err(err) => Err(UpdateError::Catalog(err)),
        }
    }

    /// Remove a mesh and its file collection record.
    ///
    /// The referenced blobs are left in the store for the orphan sweep to
    /// reclaim; record removal itself is not compensated.
    pub async fn delete_mesh(&self, user: UserId, id: MeshId) -> Result<(), UpdateError> {
        self.get(user, id).await?;

        let removed = self
            .catalog
            .remove_mesh(id)
            .await
            .map_err(UpdateError::Catalog)?;
        match self.catalog.remove_collection(removed.files).await {
            Ok(collection) => {
                info!(
                    mesh = %id,
                    collection = %collection.id,
                    blobs = collection.original_files.len(),
                    "deleted mesh; blobs left for the orphan sweep"
                );
            }
            Err(err) => {
                // The mesh record is gone either way; the collection will
                // be unreachable and its blobs reclaimed by the sweep.
                warn!(mesh = %id, "unable to remove file collection: {err}");
            }
        }
        Ok(())
    }
}
