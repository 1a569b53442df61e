//! Source discovery and digesting.
//!
//! Walks the configured source roots, digests every matching file in
//! parallel, and produces the [`Snapshot`] of the units as they exist now.

use std::path::{Path, PathBuf};

use kiln_common::{Digest, UnitRef};
use rayon::prelude::*;

use crate::error::SnapshotError;
use crate::snapshot::Snapshot;

/// Enumerates and digests the units of a project.
#[derive(Debug, Clone)]
pub struct SourceScanner {
    root: PathBuf,
    source_roots: Vec<String>,
    extensions: Vec<String>,
}

impl SourceScanner {
    /// Creates a scanner for the project at `root` reading the `src` directory.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            source_roots: vec!["src".to_string()],
            extensions: Vec::new(),
        }
    }

    /// Sets the source roots, relative to the project root.
    pub fn with_source_roots(mut self, roots: Vec<String>) -> Self {
        self.source_roots = roots;
        self
    }

    /// Restricts discovery to files with these extensions. Empty accepts every file.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Computes the digest of a single file.
    pub fn hash_file(path: &Path) -> Result<Digest, SnapshotError> {
        let content = std::fs::read(path).map_err(|e| SnapshotError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Digest::of_bytes(&content))
    }

    /// Lists every unit file under the source roots, sorted by path.
    ///
    /// Source roots that do not exist are skipped.
    pub fn discover(&self) -> Result<Vec<PathBuf>, SnapshotError> {
        let mut files = Vec::new();
        for source_root in &self.source_roots {
            let dir = self.root.join(source_root);
            if !dir.is_dir() {
                tracing::debug!(root = %dir.display(), "source root missing, skipped");
                continue;
            }
            self.walk_dir(&dir, &mut files)?;
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Digests every discovered unit.
    ///
    /// Files that disappear or cannot be read between discovery and hashing
    /// are left out, so they show up as deleted in the next diff.
    pub fn scan(&self) -> Result<Snapshot, SnapshotError> {
        let files = self.discover()?;
        let snapshot: Snapshot = files
            .par_iter()
            .filter_map(|path| {
                let unit = UnitRef::from_path(&self.root, path)?;
                match Self::hash_file(path) {
                    Ok(digest) => Some((unit, digest)),
                    Err(e) => {
                        tracing::warn!(error = %e, "unreadable unit skipped");
                        None
                    }
                }
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect();
        tracing::debug!(units = snapshot.len(), "sources scanned");
        Ok(snapshot)
    }

    fn walk_dir(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), SnapshotError> {
        let entries = std::fs::read_dir(dir).map_err(|e| SnapshotError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| SnapshotError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let path = entry.path();
            if path.is_dir() {
                self.walk_dir(&path, files)?;
            } else if self.accepts(&path) {
                files.push(path);
            }
        }
        Ok(())
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|want| want == ext))
    }
}
