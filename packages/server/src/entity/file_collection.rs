use std::path::Path;

use common::storage::StoredBlob;
use common::{BlobId, CollectionId};
use serde::{Deserialize, Serialize};

/// A geometry file and its companion material file.
///
/// The pair has no byte content of its own; both references point at blobs
/// in the owning collection's `original_files`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjMtlPair {
    pub obj: BlobId,
    pub mtl: BlobId,
}

/// The aggregate grouping all blobs belonging to one mesh upload.
///
/// `original_files` preserves every upload exactly as submitted, in
/// submission order, for audit and re-derivation. The scene slot and the
/// obj/mtl pairs are typed views onto the same blobs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCollection {
    pub id: CollectionId,
    pub original_files: Vec<BlobId>,
    pub scene_file: Option<BlobId>,
    pub obj_mtl_pairs: Vec<ObjMtlPair>,
}

impl FileCollection {
    /// Assemble a collection from the blobs stored for one upload batch.
    ///
    /// `original_files` keeps the input order. The scene slot takes the
    /// first `.blend` upload; obj/mtl pairs are matched by file stem
    /// (`chair.obj` pairs with `chair.mtl`).
    pub fn assemble(stored: &[StoredBlob]) -> Self {
        let original_files = stored.iter().map(|blob| blob.id).collect();

        let scene_file = stored
            .iter()
            .find(|blob| extension(&blob.meta.filename) == Some("blend"))
            .map(|blob| blob.id);

        let mut obj_mtl_pairs = Vec::new();
        for obj in stored {
            if extension(&obj.meta.filename) != Some("obj") {
                continue;
            }
            let obj_stem = stem(&obj.meta.filename);
            let mtl = stored.iter().find(|mtl| {
                extension(&mtl.meta.filename) == Some("mtl") && stem(&mtl.meta.filename) == obj_stem
            });
            if let Some(mtl) = mtl {
                obj_mtl_pairs.push(ObjMtlPair {
                    obj: obj.id,
                    mtl: mtl.id,
                });
            }
        }

        Self {
            id: CollectionId::generate(),
            original_files,
            scene_file,
            obj_mtl_pairs,
        }
    }

    /// Whether `blob` is referenced by this collection.
    pub fn references(&self, blob: BlobId) -> bool {
        // Pairs and the scene slot only ever alias original files, so the
        // ordered list is the full reference set.
        self.original_files.contains(&blob)
    }
}

fn extension(filename: &str) -> Option<&str> {
    Path::new(filename).extension().and_then(|e| e.to_str())
}

fn stem(filename: &str) -> Option<&str> {
    Path::new(filename).file_stem().and_then(|s| s.to_str())
}

/// One raw uploaded file, as handed over by the transport collaborator.
#[derive(Clone, Debug)]
pub struct FilePayload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}
