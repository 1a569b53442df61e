//! Where produced artifacts are written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::BuildError;

/// Storage for produced artifacts, addressed by output-relative path.
pub trait ArtifactStore {
    /// Writes an artifact, replacing any previous content.
    fn write_entry(&mut self, path: &str, bytes: &[u8]) -> Result<(), BuildError>;

    /// Removes an artifact. Returns `true` if something was removed.
    fn delete_entry(&mut self, path: &str) -> bool;

    /// Removes every artifact.
    fn clear(&mut self) -> Result<(), BuildError>;
}

/// Artifacts stored as files under an output directory.
pub struct DirArtifactStore {
    root: PathBuf,
}

impl DirArtifactStore {
    /// Creates a store writing under `root`. The directory is created lazily.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// The output directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path of the artifact at `path`.
    pub fn entry_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl ArtifactStore for DirArtifactStore {
    fn write_entry(&mut self, path: &str, bytes: &[u8]) -> Result<(), BuildError> {
        let target = self.entry_path(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(&target, bytes).map_err(|e| BuildError::Io {
            path: target,
            source: e,
        })
    }

    fn delete_entry(&mut self, path: &str) -> bool {
        let target = self.entry_path(path);
        match std::fs::remove_file(&target) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(path = %target.display(), error = %e, "could not remove stale artifact");
                false
            }
        }
    }

    fn clear(&mut self) -> Result<(), BuildError> {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BuildError::Io {
                path: self.root.clone(),
                source: e,
            }),
        }
    }
}

/// Artifacts kept in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryArtifactStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Content of the artifact at `path`.
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Paths of all stored artifacts, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn write_entry(&mut self, path: &str, bytes: &[u8]) -> Result<(), BuildError> {
        self.entries.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete_entry(&mut self, path: &str) -> bool {
        self.entries.remove(path).is_some()
    }

    fn clear(&mut self) -> Result<(), BuildError> {
        self.entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_store_write_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirArtifactStore::new(&dir.path().join("out"));
        store.write_entry("pkg/A.out", b"alpha").unwrap();
        assert_eq!(std::fs::read(store.entry_path("pkg/A.out")).unwrap(), b"alpha");

        assert!(store.delete_entry("pkg/A.out"));
        assert!(!store.delete_entry("pkg/A.out"));
    }

    #[test]
    fn dir_store_clear_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirArtifactStore::new(&dir.path().join("out"));
        store.clear().unwrap();
        store.write_entry("A.out", b"a").unwrap();
        store.clear().unwrap();
        assert!(!store.root().exists());
    }

    #[test]
    fn memory_store_basics() {
        let mut store = MemoryArtifactStore::new();
        store.write_entry("B.out", b"b").unwrap();
        store.write_entry("A.out", b"a").unwrap();
        assert_eq!(store.paths().collect::<Vec<_>>(), vec!["A.out", "B.out"]);
        assert!(store.delete_entry("A.out"));
        assert_eq!(store.get("B.out"), Some(&b"b"[..]));
        store.clear().unwrap();
        assert!(store.is_empty());
    }
}
