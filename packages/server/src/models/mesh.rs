use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{FileCollection, Mesh, MeshState, ObjMtlPair};
use crate::error::AppError;

/// Response DTO for a single mesh record.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeshResponse {
    /// Mesh ID (UUID).
    #[schema(example = "6f2c1de8-0b7e-4f3a-9d25-3d0b4a1c9e71")]
    pub id: String,
    /// Owner user ID (UUID).
    pub owner: String,
    /// Unique display name.
    #[schema(example = "victorian-armchair")]
    pub name: String,
    pub short_desc: String,
    pub long_desc: String,
    pub state: MeshState,
    /// Write version, bumped on every applied update.
    #[schema(example = 1)]
    pub version: u32,
    pub created: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    /// ID of the mesh's file collection.
    pub files: String,
}

impl From<Mesh> for MeshResponse {
    fn from(mesh: Mesh) -> Self {
        Self {
            id: mesh.id.to_string(),
            owner: mesh.owner.to_string(),
            name: mesh.name,
            short_desc: mesh.short_desc,
            long_desc: mesh.long_desc,
            state: mesh.state,
            version: mesh.version,
            created: mesh.created,
            last_accessed: mesh.last_accessed,
            files: mesh.files.to_string(),
        }
    }
}

/// Response DTO for listing a user's meshes.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeshListResponse {
    pub meshes: Vec<MeshResponse>,
    pub total: u64,
}

/// One stored file within a collection.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FileEntry {
    /// Blob ID (UUID).
    pub id: String,
    /// Original upload filename.
    #[schema(example = "armchair.obj")]
    pub filename: String,
    /// MIME content type.
    #[schema(example = "model/obj")]
    pub content_type: String,
    /// Size in bytes.
    #[schema(example = 142857)]
    pub size: u64,
    /// SHA-256 checksum, hex-encoded.
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// A stem-matched OBJ/MTL pairing.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ObjMtlPairResponse {
    pub obj: String,
    pub mtl: String,
}

impl From<&ObjMtlPair> for ObjMtlPairResponse {
    fn from(pair: &ObjMtlPair) -> Self {
        Self {
            obj: pair.obj.to_string(),
            mtl: pair.mtl.to_string(),
        }
    }
}

/// Response DTO for a mesh's file collection.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CollectionResponse {
    /// Collection ID (UUID).
    pub id: String,
    /// All files in upload order.
    pub original_files: Vec<FileEntry>,
    /// Blob ID of the scene file, when one was uploaded.
    pub scene_file: Option<String>,
    pub obj_mtl_pairs: Vec<ObjMtlPairResponse>,
}

impl CollectionResponse {
    pub fn new(collection: &FileCollection, files: Vec<FileEntry>) -> Self {
        Self {
            id: collection.id.to_string(),
            original_files: files,
            scene_file: collection.scene_file.map(|id| id.to_string()),
            obj_mtl_pairs: collection
                .obj_mtl_pairs
                .iter()
                .map(ObjMtlPairResponse::from)
                .collect(),
        }
    }
}

/// Request body for patching mesh metadata. Absent fields are unchanged.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateMeshRequest {
    #[schema(example = "victorian-armchair-v2")]
    pub name: Option<String>,
    pub short_desc: Option<String>,
    pub long_desc: Option<String>,
}

/// Request body for a state transition.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateStateRequest {
    pub state: MeshState,
}

/// Validate a trimmed mesh name (1-256 Unicode characters).
pub fn validate_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 256 {
        return Err(AppError::Validation(
            "Mesh name must be 1-256 characters".into(),
        ));
    }
    Ok(())
}
