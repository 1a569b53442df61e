//! In-progress recompilation state layered on a snapshot.

use std::collections::BTreeSet;

use kiln_common::{Digest, UnitRef};

use crate::snapshot::Snapshot;

/// Tracks which units must be recompiled or dropped in the current round.
///
/// The base snapshot holds the current digest of every existing unit. Units
/// marked for recompilation report an unknown digest through
/// [`as_snapshot`](Self::as_snapshot), so persisting that view makes the next
/// build see them as changed until a round compiles them successfully.
///
/// Once [`mark_recompile_all`](Self::mark_recompile_all) has been called the
/// flag stays set for the lifetime of the delta.
#[derive(Debug, Clone)]
pub struct SnapshotDelta {
    base: Snapshot,
    to_recompile: BTreeSet<UnitRef>,
    deleted: BTreeSet<UnitRef>,
    recompile_all: bool,
}

impl SnapshotDelta {
    /// Creates a delta over `base` with nothing marked.
    pub fn new(base: Snapshot) -> Self {
        Self {
            base,
            to_recompile: BTreeSet::new(),
            deleted: BTreeSet::new(),
            recompile_all: false,
        }
    }

    /// Creates a delta that recompiles every unit of `base`.
    ///
    /// Used for clean builds and explicit rebuild requests.
    pub fn full_rebuild(base: Snapshot) -> Self {
        let mut delta = Self::new(base);
        delta.mark_recompile_all();
        delta
    }

    /// Computes the initial delta between the previous generation and the units on disk now.
    ///
    /// Units known before but absent now are deleted. Units that are new,
    /// whose digest changed, or whose previous digest was unknown are marked
    /// for recompilation.
    pub fn from_diff(previous: &Snapshot, current: Snapshot) -> Self {
        let mut delta = Self::new(current);

        for (unit, digest) in delta.base.iter() {
            let changed = match previous.digest(unit) {
                Some(old) => old.is_unknown() || old != digest,
                None => true,
            };
            if changed {
                delta.to_recompile.insert(unit.clone());
            }
        }

        for unit in previous.units() {
            if !delta.base.contains(unit) {
                delta.deleted.insert(unit.clone());
            }
        }

        delta
    }

    /// Marks `unit` for recompilation. Returns `true` if it was not already marked.
    pub fn mark_recompile(&mut self, unit: UnitRef) -> bool {
        if self.recompile_all && self.base.contains(&unit) {
            return false;
        }
        self.to_recompile.insert(unit)
    }

    /// Marks every unit of the base snapshot for recompilation.
    pub fn mark_recompile_all(&mut self) {
        self.recompile_all = true;
    }

    /// Records that `unit` no longer exists.
    pub fn mark_deleted(&mut self, unit: UnitRef) -> bool {
        self.to_recompile.remove(&unit);
        self.deleted.insert(unit)
    }

    /// Returns `true` once a full recompilation has been requested.
    pub fn is_recompile_all(&self) -> bool {
        self.recompile_all
    }

    /// Returns `true` if anything is marked for recompilation or deletion.
    pub fn has_changes(&self) -> bool {
        self.recompile_all || !self.to_recompile.is_empty() || !self.deleted.is_empty()
    }

    /// Units to recompile, including every base unit when recompiling all.
    pub fn sources_to_recompile(&self) -> BTreeSet<UnitRef> {
        if self.recompile_all {
            let mut all = self.base.sorted_units();
            all.extend(self.to_recompile.iter().cloned());
            all
        } else {
            self.to_recompile.clone()
        }
    }

    /// Units recorded as deleted.
    pub fn deleted_sources(&self) -> &BTreeSet<UnitRef> {
        &self.deleted
    }

    /// The snapshot this delta is layered on.
    pub fn base(&self) -> &Snapshot {
        &self.base
    }

    /// Folds the recompilation marks of `other` into this delta.
    ///
    /// Deletions of `other` are not carried over.
    pub fn absorb(&mut self, other: &SnapshotDelta) {
        if other.recompile_all {
            self.mark_recompile_all();
        }
        for unit in &other.to_recompile {
            self.mark_recompile(unit.clone());
        }
    }

    /// Produces the snapshot to persist for the next invocation.
    ///
    /// Equal to the base snapshot, except that units still marked for
    /// recompilation report an unknown digest, and units still pending
    /// deletion are kept with an unknown digest so the next build detects
    /// their removal again.
    pub fn as_snapshot(&self) -> Snapshot {
        let pending = |unit: &UnitRef| self.recompile_all || self.to_recompile.contains(unit);
        let current = self.base.iter().map(|(unit, digest)| {
            let digest = if pending(unit) {
                Digest::unknown()
            } else {
                digest.clone()
            };
            (unit.clone(), digest)
        });
        let gone = self
            .deleted
            .iter()
            .filter(|unit| !self.base.contains(unit))
            .map(|unit| (unit.clone(), Digest::unknown()));
        current.chain(gone).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(pairs: &[(&str, &str)]) -> Snapshot {
        pairs
            .iter()
            .map(|(u, d)| (UnitRef::new(*u), Digest::from_string(*d)))
            .collect()
    }

    fn units(names: &[&str]) -> BTreeSet<UnitRef> {
        names.iter().map(|n| UnitRef::new(*n)).collect()
    }

    #[test]
    fn initial_diff_scenario() {
        let previous = snap(&[("A", "d1"), ("B", "d2")]);
        let current = snap(&[("A", "d1changed"), ("C", "d3")]);
        let delta = SnapshotDelta::from_diff(&previous, current);
        assert_eq!(delta.deleted_sources(), &units(&["B"]));
        assert_eq!(delta.sources_to_recompile(), units(&["A", "C"]));
        assert!(delta.has_changes());
        assert!(!delta.is_recompile_all());
    }

    #[test]
    fn deleted_unit_never_recompiled() {
        let previous = snap(&[("A", "d1"), ("B", "d2")]);
        let current = snap(&[("A", "d1")]);
        let delta = SnapshotDelta::from_diff(&previous, current);
        assert!(delta.deleted_sources().contains(&UnitRef::new("B")));
        assert!(!delta.sources_to_recompile().contains(&UnitRef::new("B")));
    }

    #[test]
    fn unknown_previous_digest_counts_as_changed() {
        let previous: Snapshot = [(UnitRef::new("A"), Digest::unknown())].into_iter().collect();
        let current = snap(&[("A", "d1")]);
        let delta = SnapshotDelta::from_diff(&previous, current);
        assert_eq!(delta.sources_to_recompile(), units(&["A"]));
    }

    #[test]
    fn unchanged_has_no_changes() {
        let previous = snap(&[("A", "d1"), ("B", "d2")]);
        let delta = SnapshotDelta::from_diff(&previous, previous.clone());
        assert!(!delta.has_changes());
        assert_eq!(delta.as_snapshot(), previous);
    }

    #[test]
    fn mark_recompile_is_idempotent() {
        let mut delta = SnapshotDelta::new(snap(&[("A", "d1")]));
        assert!(delta.mark_recompile(UnitRef::new("A")));
        assert!(!delta.mark_recompile(UnitRef::new("A")));
        assert_eq!(delta.sources_to_recompile().len(), 1);
    }

    #[test]
    fn recompile_all_reports_every_base_unit() {
        let mut delta = SnapshotDelta::new(snap(&[("A", "1"), ("B", "2"), ("C", "3")]));
        delta.mark_recompile_all();
        delta.mark_recompile_all();
        assert!(delta.is_recompile_all());
        assert!(delta.has_changes());
        assert_eq!(delta.sources_to_recompile(), units(&["A", "B", "C"]));
    }

    #[test]
    fn recompile_all_on_empty_base_still_has_changes() {
        let delta = SnapshotDelta::full_rebuild(Snapshot::empty());
        assert!(delta.has_changes());
        assert!(delta.sources_to_recompile().is_empty());
    }

    #[test]
    fn as_snapshot_hides_pending_digests() {
        let mut delta = SnapshotDelta::new(snap(&[("A", "1"), ("B", "2")]));
        delta.mark_recompile(UnitRef::new("A"));
        let view = delta.as_snapshot();
        assert!(view.digest(&UnitRef::new("A")).unwrap().is_unknown());
        assert_eq!(view.digest(&UnitRef::new("B")), Some(&Digest::from_string("2")));
    }

    #[test]
    fn as_snapshot_of_recompile_all_is_all_unknown() {
        let delta = SnapshotDelta::full_rebuild(snap(&[("A", "1"), ("B", "2")]));
        let view = delta.as_snapshot();
        assert_eq!(view.len(), 2);
        assert!(view.iter().all(|(_, d)| d.is_unknown()));
    }

    #[test]
    fn as_snapshot_keeps_pending_deletions() {
        let previous = snap(&[("A", "1"), ("B", "2")]);
        let delta = SnapshotDelta::from_diff(&previous, snap(&[("A", "1")]));
        let view = delta.as_snapshot();
        assert!(view.digest(&UnitRef::new("B")).unwrap().is_unknown());

        // the next invocation re-detects the deletion
        let again = SnapshotDelta::from_diff(&view, snap(&[("A", "1")]));
        assert_eq!(again.deleted_sources(), &units(&["B"]));
        assert!(again.sources_to_recompile().is_empty());
    }

    #[test]
    fn mark_deleted_unmarks_recompile() {
        let mut delta = SnapshotDelta::new(snap(&[("A", "1")]));
        delta.mark_recompile(UnitRef::new("X"));
        delta.mark_deleted(UnitRef::new("X"));
        assert!(delta.sources_to_recompile().is_empty());
        assert_eq!(delta.deleted_sources(), &units(&["X"]));
    }

    #[test]
    fn absorb_merges_marks_but_not_deletions() {
        let base = snap(&[("A", "1"), ("B", "2"), ("C", "3")]);
        let previous = snap(&[("A", "0"), ("B", "2"), ("C", "3"), ("D", "4")]);
        let mut current = SnapshotDelta::from_diff(&previous, base.clone());
        let mut next = SnapshotDelta::new(base);
        next.mark_recompile(UnitRef::new("B"));
        next.mark_deleted(UnitRef::new("Z"));
        current.absorb(&next);
        assert_eq!(current.sources_to_recompile(), units(&["A", "B"]));
        assert_eq!(current.deleted_sources(), &units(&["D"]));
    }

    #[test]
    fn absorb_propagates_recompile_all() {
        let base = snap(&[("A", "1"), ("B", "2")]);
        let mut current = SnapshotDelta::new(base.clone());
        current.mark_recompile(UnitRef::new("A"));
        current.absorb(&SnapshotDelta::full_rebuild(base));
        assert!(current.is_recompile_all());
        assert_eq!(current.sources_to_recompile(), units(&["A", "B"]));
    }
}
