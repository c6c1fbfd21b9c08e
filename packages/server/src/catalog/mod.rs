mod memory;

pub use memory::MemoryCatalog;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CollectionId, MeshId, UserId};
use thiserror::Error;

use crate::entity::{FileCollection, Mesh};

/// Errors from the record catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A mesh with this name already exists. Names are unique, case-sensitive.
    #[error("a mesh with name '{0}' already exists")]
    DuplicateName(String),

    #[error("file collection {0} does not exist")]
    CollectionNotFound(CollectionId),

    #[error("mesh {0} does not exist")]
    MeshNotFound(MeshId),

    /// The caller's copy of the mesh is stale; the write was rejected.
    #[error("mesh version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u32, actual: u32 },

    /// The backing store failed.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Persistence of file-collection and mesh records, keyed by their typed
/// identifiers. References between records are resolved by lookup here,
/// never by embedding.
///
/// Mesh writes are version-gated: an update carries the version the caller
/// read, and fails with `VersionConflict` if the persisted record has moved
/// on. Each applied update increments the persisted version.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Persist a collection record. All blob references must already exist;
    /// the caller (the batch save protocol) guarantees this.
    async fn insert_collection(&self, collection: FileCollection) -> Result<(), CatalogError>;

    async fn get_collection(&self, id: CollectionId) -> Result<FileCollection, CatalogError>;

    /// Remove a collection record, returning it.
    async fn remove_collection(&self, id: CollectionId) -> Result<FileCollection, CatalogError>;

    /// All collection records. Used by the orphan sweep.
    async fn collections(&self) -> Result<Vec<FileCollection>, CatalogError>;

    /// Persist a new mesh, rejecting duplicate names.
    async fn insert_mesh(&self, mesh: Mesh) -> Result<(), CatalogError>;

    async fn get_mesh(&self, id: MeshId) -> Result<Mesh, CatalogError>;

    /// Meshes owned by `owner`, ordered by creation time.
    async fn list_meshes(&self, owner: UserId) -> Result<Vec<Mesh>, CatalogError>;

    /// Version-gated write of an updated mesh. `mesh.version` must equal
    /// the persisted version; on success the persisted record carries
    /// `mesh.version + 1`. Name changes are checked for uniqueness.
    async fn update_mesh(&self, mesh: &Mesh) -> Result<Mesh, CatalogError>;

    /// Record an access time without bumping the version.
    async fn touch_mesh(&self, id: MeshId, at: DateTime<Utc>) -> Result<(), CatalogError>;

    /// Remove a mesh record, returning it.
    async fn remove_mesh(&self, id: MeshId) -> Result<Mesh, CatalogError>;
}
