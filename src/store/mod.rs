use std::io;

use thiserror::Error;

pub mod fs;

pub use fs::DirStore;

/// One listed object. Keys are slash-separated paths relative to the
/// bucket root; the first segment names the submitting organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store IO error: {0}")]
    Io(#[from] io::Error),
    #[error("object '{0}' not found")]
    Missing(String),
}

/// Listing and retrieval surface of the submission bucket. The
/// ingestion walk only ever consumes keys and text blobs, so anything
/// that can enumerate keyed text satisfies it.
pub trait ObjectStore {
    fn list_objects(&self) -> Result<Vec<ObjectEntry>, StoreError>;
    fn load_object(&self, key: &str) -> Result<String, StoreError>;
}
