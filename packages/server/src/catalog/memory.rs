use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CollectionId, MeshId, UserId};

use super::{Catalog, CatalogError};
use crate::entity::{FileCollection, Mesh};

#[derive(Default)]
struct Inner {
    collections: HashMap<CollectionId, FileCollection>,
    meshes: HashMap<MeshId, Mesh>,
    /// Case-sensitive name index enforcing mesh name uniqueness.
    names: HashMap<String, MeshId>,
}

/// In-memory catalog guarded by a single lock.
///
/// Inserts and gated updates are atomic under the write lock, which is all
/// the coordination the subsystem promises: same-mesh writers race on the
/// version gate, and the loser gets a `VersionConflict`.
#[derive(Default)]
pub struct MemoryCatalog {
    inner: RwLock<Inner>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mesh records. Test accessor.
    pub fn mesh_count(&self) -> usize {
        self.inner.read().unwrap().meshes.len()
    }

    /// Number of collection records. Test accessor.
    pub fn collection_count(&self) -> usize {
        self.inner.read().unwrap().collections.len()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn insert_collection(&self, collection: FileCollection) -> Result<(), CatalogError> {
        let mut inner = self.inner.write().unwrap();
        inner.collections.insert(collection.id, collection);
        Ok(())
    }

    async fn get_collection(&self, id: CollectionId) -> Result<FileCollection, CatalogError> {
        self.inner
            .read()
            .unwrap()
            .collections
            .get(&id)
            .cloned()
            .ok_or(CatalogError::CollectionNotFound(id))
    }

    async fn remove_collection(&self, id: CollectionId) -> Result<FileCollection, CatalogError> {
        self.inner
            .write()
            .unwrap()
            .collections
            .remove(&id)
            .ok_or(CatalogError::CollectionNotFound(id))
    }

    async fn collections(&self) -> Result<Vec<FileCollection>, CatalogError> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .collections
            .values()
            .cloned()
            .collect())
    }

    async fn insert_mesh(&self, mesh: Mesh) -> Result<(), CatalogError> {
        let mut inner = self.inner.write().unwrap();
        if inner.names.contains_key(&mesh.name) {
            return Err(CatalogError::DuplicateName(mesh.name.clone()));
        }
        inner.names.insert(mesh.name.clone(), mesh.id);
        inner.meshes.insert(mesh.id, mesh);
        Ok(())
    }

    async fn get_mesh(&self, id: MeshId) -> Result<Mesh, CatalogError> {
        self.inner
            .read()
            .unwrap()
            .meshes
            .get(&id)
            .cloned()
            .ok_or(CatalogError::MeshNotFound(id))
    }

    async fn list_meshes(&self, owner: UserId) -> Result<Vec<Mesh>, CatalogError> {
        let mut meshes: Vec<Mesh> = self
            .inner
            .read()
            .unwrap()
            .meshes
            .values()
            .filter(|mesh| mesh.owner == owner)
            .cloned()
            .collect();
        meshes.sort_by_key(|mesh| mesh.created);
        Ok(meshes)
    }

    async fn update_mesh(&self, mesh: &Mesh) -> Result<Mesh, CatalogError> {
        let mut inner = self.inner.write().unwrap();

        let current = inner
            .meshes
            .get(&mesh.id)
            .ok_or(CatalogError::MeshNotFound(mesh.id))?;
        if current.version != mesh.version {
            return Err(CatalogError::VersionConflict {
                expected: mesh.version,
                actual: current.version,
            });
        }

        let old_name = current.name.clone();
        if mesh.name != old_name {
            if inner.names.contains_key(&mesh.name) {
                return Err(CatalogError::DuplicateName(mesh.name.clone()));
            }
            inner.names.remove(&old_name);
            inner.names.insert(mesh.name.clone(), mesh.id);
        }

        let mut updated = mesh.clone();
        updated.version += 1;
        inner.meshes.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn touch_mesh(&self, id: MeshId, at: DateTime<Utc>) -> Result<(), CatalogError> {
        let mut inner = self.inner.write().unwrap();
        let mesh = inner
            .meshes
            .get_mut(&id)
            .ok_or(CatalogError::MeshNotFound(id))?;
        mesh.last_accessed = at;
        Ok(())
    }

    async fn remove_mesh(&self, id: MeshId) -> Result<Mesh, CatalogError> {
        let mut inner = self.inner.write().unwrap();
        let mesh = inner
            .meshes
            .remove(&id)
            .ok_or(CatalogError::MeshNotFound(id))?;
        inner.names.remove(&mesh.name);
        Ok(mesh)
    }
}
