pub mod id;
pub mod storage;

pub use id::{BlobId, CollectionId, Id, MeshId, UserId};
