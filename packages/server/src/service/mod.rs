mod gc;
mod mesh;

pub use gc::{SweepError, SweepReport, sweep_orphans};
pub use mesh::{CreateError, GetError, MeshPatch, MeshService, UpdateError, UploadError};
