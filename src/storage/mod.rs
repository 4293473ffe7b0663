//! Local filesystem storage for accepted uploads

mod error;
mod filesystem;

pub use error::StorageError;
pub use filesystem::{PendingArtifact, StoredArtifact, UploadStore};
