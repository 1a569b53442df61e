//! Dependency graph between compilation units and the artifacts they produce.
//!
//! The orchestrator only talks to the [`DependencyGraph`] trait: it builds a
//! [`Delta`] describing one round, asks the graph to
//! [`differentiate`](DependencyGraph::differentiate) it into the set of
//! affected units, and [`integrate`](DependencyGraph::integrate)s the result
//! once the round compiled cleanly. [`NodeGraph`] is the default engine.

#![warn(missing_docs)]

pub mod delta;
pub mod engine;
pub mod error;
pub mod node;
pub mod params;
pub mod store;

pub use delta::Delta;
pub use engine::NodeGraph;
pub use error::GraphError;
pub use node::{Node, NodeId};
pub use params::{DifferentiateParams, DifferentiateResult, UnitFilter};
pub use store::{GraphState, GraphStore, GRAPH_FILE};

use std::collections::BTreeSet;

use kiln_common::UnitRef;

/// The capability the build loop needs from a dependency graph.
///
/// Only one upstream view is authoritative: [`differentiate`](Self::differentiate)
/// never changes it, [`integrate`](Self::integrate) replaces it.
pub trait DependencyGraph {
    /// Starts a delta for units that are recompiled or deleted this round.
    ///
    /// A source-only delta describes changes before anything was compiled and
    /// never receives node associations.
    fn create_delta(
        &self,
        recompiled: BTreeSet<UnitRef>,
        deleted: BTreeSet<UnitRef>,
        source_only: bool,
    ) -> Delta {
        Delta::new(recompiled, deleted, source_only)
    }

    /// Computes which units are affected by `delta` without committing it.
    fn differentiate(
        &self,
        delta: Delta,
        params: &DifferentiateParams,
    ) -> Result<DifferentiateResult, GraphError>;

    /// Commits a differentiated delta, making it the authoritative state.
    fn integrate(&mut self, result: DifferentiateResult) -> Result<(), GraphError>;

    /// Nodes currently recorded as produced by `unit`.
    fn nodes_of(&self, unit: &UnitRef) -> Vec<NodeId>;

    /// Returns `true` if the graph holds no nodes.
    fn is_empty(&self) -> bool;

    /// Drops all state, including anything persisted.
    fn clear(&mut self) -> Result<(), GraphError>;
}
