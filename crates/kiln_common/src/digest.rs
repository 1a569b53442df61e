//! Opaque content digests recorded per compilation unit.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::ContentHash;

/// An opaque fingerprint of a unit's content.
///
/// Two units with equal digests are considered unchanged. The empty digest
/// means "unknown": it never equals a computed digest, so any unit carrying it
/// is seen as changed by the next comparison.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// The unknown digest.
    pub fn unknown() -> Self {
        Self(String::new())
    }

    /// Computes the digest of raw unit content.
    pub fn of_bytes(content: &[u8]) -> Self {
        Self(ContentHash::from_bytes(content).to_string())
    }

    /// Wraps an already computed digest string.
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns `true` for the unknown (empty) digest.
    pub fn is_unknown(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the digest text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<unknown>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_is_empty() {
        assert!(Digest::unknown().is_unknown());
        assert_eq!(Digest::unknown(), Digest::default());
    }

    #[test]
    fn computed_digest_is_never_unknown() {
        assert!(!Digest::of_bytes(b"").is_unknown());
        assert_ne!(Digest::of_bytes(b""), Digest::unknown());
    }

    #[test]
    fn same_content_same_digest() {
        assert_eq!(Digest::of_bytes(b"abc"), Digest::of_bytes(b"abc"));
        assert_ne!(Digest::of_bytes(b"abc"), Digest::of_bytes(b"abd"));
    }

    #[test]
    fn display_unknown() {
        assert_eq!(Digest::unknown().to_string(), "<unknown>");
        assert_eq!(Digest::from_string("d1").to_string(), "d1");
    }
}
