use std::fs;
use std::path::{Path, PathBuf};

use crate::store::{ObjectEntry, ObjectStore, StoreError};

/// Filesystem mirror of a submission bucket: every regular file under
/// the root becomes one object whose key is its slash-separated
/// relative path. Listing order is sorted so runs are deterministic.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirStore { root: root.into() }
    }

    fn collect(&self, dir: &Path, keys: &mut Vec<String>) -> Result<(), StoreError> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                self.collect(&path, keys)?;
            } else if let Ok(rel) = path.strip_prefix(&self.root) {
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                keys.push(key);
            }
        }
        Ok(())
    }
}

impl ObjectStore for DirStore {
    fn list_objects(&self) -> Result<Vec<ObjectEntry>, StoreError> {
        let mut keys = Vec::new();
        self.collect(&self.root, &mut keys)?;
        keys.sort();
        Ok(keys.into_iter().map(|key| ObjectEntry { key }).collect())
    }

    fn load_object(&self, key: &str) -> Result<String, StoreError> {
        let path = self.root.join(key);
        if !path.is_file() {
            return Err(StoreError::Missing(key.to_string()));
        }
        Ok(fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("submission-matrix-tests")
            .join(format!("{}-{}", name, std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir).unwrap();
        }
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_list_and_load_round_trip() {
        let root = scratch_dir("dirstore");
        fs::create_dir_all(root.join("orgA")).unwrap();
        fs::write(root.join("orgA/case.tsv"), "id\tname\nc1\tfoo\n").unwrap();
        fs::write(root.join("orgA/validated.status"), "").unwrap();

        let store = DirStore::new(&root);
        let entries = store.list_objects().unwrap();
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["orgA/case.tsv", "orgA/validated.status"]);

        let body = store.load_object("orgA/case.tsv").unwrap();
        assert!(body.starts_with("id\tname"));

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_object() {
        let root = scratch_dir("dirstore-missing");
        let store = DirStore::new(&root);
        let err = store.load_object("nope.tsv").unwrap_err();
        assert!(matches!(err, StoreError::Missing(_)));
        fs::remove_dir_all(&root).unwrap();
    }
}
