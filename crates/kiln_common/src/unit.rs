//! Compilation unit references.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// An opaque identifier for one source input, usually a project-relative path.
///
/// Paths are stored with `/` separators so references compare equal across
/// platforms. Equality, ordering and hashing are those of the path string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitRef(String);

impl UnitRef {
    /// Creates a reference from a relative path string.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        if path.contains('\\') {
            Self(path.replace('\\', "/"))
        } else {
            Self(path)
        }
    }

    /// Creates a reference for `path` relative to `root`.
    ///
    /// Returns `None` if `path` is not under `root` or is not valid UTF-8.
    pub fn from_path(root: &Path, path: &Path) -> Option<Self> {
        let relative = path.strip_prefix(root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        if parts.is_empty() {
            return None;
        }
        Some(Self(parts.join("/")))
    }

    /// Returns the underlying path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves this reference against a project root.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }

    /// Returns the final path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns the final path segment without its extension.
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(idx) => &name[..idx],
        }
    }

    /// Returns the extension of the final path segment, if any.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// Returns `true` if this reference lies under the directory `prefix`.
    pub fn is_under(&self, prefix: &str) -> bool {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return true;
        }
        self.0 == prefix
            || (self.0.starts_with(prefix) && self.0.as_bytes().get(prefix.len()) == Some(&b'/'))
    }
}

impl fmt::Display for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitRef({})", self.0)
    }
}

impl From<&str> for UnitRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backslashes_normalized() {
        assert_eq!(UnitRef::new("src\\a\\b.kd"), UnitRef::new("src/a/b.kd"));
    }

    #[test]
    fn from_path_relative_to_root() {
        let root = Path::new("/proj");
        let unit = UnitRef::from_path(root, Path::new("/proj/src/app/main.kd")).unwrap();
        assert_eq!(unit.as_str(), "src/app/main.kd");
        assert!(UnitRef::from_path(root, Path::new("/elsewhere/x.kd")).is_none());
        assert!(UnitRef::from_path(root, root).is_none());
    }

    #[test]
    fn name_stem_extension() {
        let unit = UnitRef::new("src/module-info.kd");
        assert_eq!(unit.file_name(), "module-info.kd");
        assert_eq!(unit.file_stem(), "module-info");
        assert_eq!(unit.extension(), Some("kd"));

        let dotfile = UnitRef::new("src/.hidden");
        assert_eq!(dotfile.file_stem(), ".hidden");
        assert_eq!(dotfile.extension(), None);
    }

    #[test]
    fn is_under_respects_segment_boundaries() {
        let unit = UnitRef::new("lib/vendor/a.kd");
        assert!(unit.is_under("lib"));
        assert!(unit.is_under("lib/"));
        assert!(unit.is_under("lib/vendor"));
        assert!(!unit.is_under("li"));
        assert!(!unit.is_under("lib/vend"));
        assert!(unit.is_under(""));
    }

    #[test]
    fn serde_is_plain_string() {
        let json = serde_json::to_string(&UnitRef::new("src/a.kd")).unwrap();
        assert_eq!(json, "\"src/a.kd\"");
    }
}
