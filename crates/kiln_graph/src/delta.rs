//! Proposed graph changes for one round.

use std::collections::BTreeSet;

use kiln_common::UnitRef;

use crate::node::Node;

/// Units recompiled or deleted in a round plus the nodes the round produced.
///
/// Nothing in a delta is authoritative until it has been differentiated and
/// integrated.
#[derive(Debug, Clone)]
pub struct Delta {
    recompiled: BTreeSet<UnitRef>,
    deleted: BTreeSet<UnitRef>,
    associations: Vec<(Node, BTreeSet<UnitRef>)>,
    source_only: bool,
}

impl Delta {
    /// Creates a delta with no associations yet.
    pub fn new(recompiled: BTreeSet<UnitRef>, deleted: BTreeSet<UnitRef>, source_only: bool) -> Self {
        Self {
            recompiled,
            deleted,
            associations: Vec::new(),
            source_only,
        }
    }

    /// Records that `units` produced `node`.
    pub fn associate(&mut self, node: Node, units: BTreeSet<UnitRef>) {
        self.associations.push((node, units));
    }

    /// Units recompiled in this delta.
    pub fn recompiled(&self) -> &BTreeSet<UnitRef> {
        &self.recompiled
    }

    /// Units deleted in this delta.
    pub fn deleted(&self) -> &BTreeSet<UnitRef> {
        &self.deleted
    }

    /// Every unit this delta touches.
    pub fn touched(&self) -> BTreeSet<UnitRef> {
        self.recompiled.union(&self.deleted).cloned().collect()
    }

    /// Produced nodes with the units that contributed to them.
    pub fn associations(&self) -> &[(Node, BTreeSet<UnitRef>)] {
        &self.associations
    }

    /// Returns `true` if the delta was built from snapshot information alone.
    pub fn is_source_only(&self) -> bool {
        self.source_only
    }
}
