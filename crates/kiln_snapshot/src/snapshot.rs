//! Immutable unit-to-digest mappings.

use std::collections::hash_map::Iter;
use std::collections::{BTreeSet, HashMap};

use kiln_common::{Digest, UnitRef};

/// Digests of every unit known at one build generation.
///
/// Keys are unique and iteration order carries no meaning; use
/// [`sorted_units`](Self::sorted_units) where a stable order is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: HashMap<UnitRef, Digest>,
}

impl Snapshot {
    /// Creates an empty snapshot, the state before any build.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the digest recorded for `unit`.
    pub fn digest(&self, unit: &UnitRef) -> Option<&Digest> {
        self.entries.get(unit)
    }

    /// Returns `true` if `unit` is part of this snapshot.
    pub fn contains(&self, unit: &UnitRef) -> bool {
        self.entries.contains_key(unit)
    }

    /// Number of units in the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no units are recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(unit, digest)` pairs in arbitrary order.
    pub fn iter(&self) -> Iter<'_, UnitRef, Digest> {
        self.entries.iter()
    }

    /// Iterates over the units in arbitrary order.
    pub fn units(&self) -> impl Iterator<Item = &UnitRef> {
        self.entries.keys()
    }

    /// Returns all units in sorted order.
    pub fn sorted_units(&self) -> BTreeSet<UnitRef> {
        self.entries.keys().cloned().collect()
    }
}

impl FromIterator<(UnitRef, Digest)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (UnitRef, Digest)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a UnitRef, &'a Digest);
    type IntoIter = Iter<'a, UnitRef, Digest>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
