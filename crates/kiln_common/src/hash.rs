//! XXH3-128 fingerprints of unit contents and persisted state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit XXH3 fingerprint.
///
/// Equal fingerprints are taken to mean equal content. Rendered as 32
/// lower-case hex digits, which is also the textual form of a unit
/// [`Digest`](crate::Digest).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Fingerprints `data`.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(data).to_le_bytes())
    }

    /// The raw little-endian hash bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_string();
        write!(f, "ContentHash({}..)", &hex[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_unit_text_same_hash() {
        assert_eq!(
            ContentHash::from_bytes(b"def Foo 1"),
            ContentHash::from_bytes(b"def Foo 1")
        );
        assert_ne!(
            ContentHash::from_bytes(b"def Foo 1"),
            ContentHash::from_bytes(b"def Foo 2")
        );
    }

    #[test]
    fn hex_matches_bytes() {
        let hash = ContentHash::from_bytes(b"unit");
        let hex = hash.to_string();
        assert_eq!(hex.len(), 32);
        assert_eq!(&hex[..2], format!("{:02x}", hash.as_bytes()[0]));
        assert_eq!(format!("{hash:?}"), format!("ContentHash({}..)", &hex[..8]));
    }
}
