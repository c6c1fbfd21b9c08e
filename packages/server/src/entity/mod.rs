pub mod file_collection;
pub mod mesh;

pub use file_collection::{FileCollection, FilePayload, ObjMtlPair};
pub use mesh::{Mesh, MeshState};
