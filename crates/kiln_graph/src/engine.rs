//! The default graph engine.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use kiln_common::UnitRef;

use crate::delta::Delta;
use crate::error::GraphError;
use crate::node::{Node, NodeId};
use crate::params::{DifferentiateParams, DifferentiateResult};
use crate::store::{GraphState, GraphStore};
use crate::DependencyGraph;

/// Node-level dependency graph with optional on-disk persistence.
///
/// A unit is affected when one of its nodes uses a node that changed: a node
/// whose producing unit was deleted, a node a recompiled unit no longer
/// produces, or a re-produced node whose signature differs. When more than
/// `full_rebuild_ratio` of the known units would be affected the result is
/// reported as non-incremental.
pub struct NodeGraph {
    state: GraphState,
    store: Option<GraphStore>,
    full_rebuild_ratio: f64,
}

impl NodeGraph {
    /// Creates an empty graph kept only in memory.
    pub fn in_memory(full_rebuild_ratio: f64) -> Self {
        Self {
            state: GraphState::default(),
            store: None,
            full_rebuild_ratio,
        }
    }

    /// Opens the graph persisted under `state_dir`.
    ///
    /// A missing or unreadable graph file yields an empty graph.
    pub fn open(state_dir: &Path, full_rebuild_ratio: f64) -> Self {
        let store = GraphStore::new(state_dir);
        let state = match store.read() {
            Some(state) => state,
            None => {
                if store.path().exists() {
                    tracing::warn!(path = %store.path().display(), "discarding unreadable graph state");
                }
                GraphState::default()
            }
        };
        Self {
            state,
            store: Some(store),
            full_rebuild_ratio,
        }
    }

    /// The current authoritative state.
    pub fn state(&self) -> &GraphState {
        &self.state
    }

    /// Units integrated so far.
    pub fn known_units(&self) -> impl Iterator<Item = &UnitRef> {
        self.state.sources.keys()
    }

    /// Looks up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.state.nodes.get(id)
    }

    fn changed_nodes(&self, delta: &Delta, params: &DifferentiateParams) -> BTreeSet<NodeId> {
        let mut changed = BTreeSet::new();
        for unit in delta.deleted() {
            if let Some(ids) = self.state.sources.get(unit) {
                changed.extend(ids.iter().cloned());
            }
        }
        if delta.is_source_only() {
            return changed;
        }

        let produced: BTreeMap<&NodeId, &Node> =
            delta.associations().iter().map(|(node, _)| (&node.id, node)).collect();
        for unit in delta.recompiled() {
            let Some(ids) = self.state.sources.get(unit) else {
                continue;
            };
            for id in ids {
                match produced.get(id) {
                    Some(node) => {
                        let before = self.state.nodes.get(id).map(|n| &n.signature);
                        if before != Some(&node.signature) {
                            changed.insert(id.clone());
                        }
                    }
                    // a failed compilation may simply not have emitted it
                    None if params.compiled_with_errors => {}
                    None => {
                        changed.insert(id.clone());
                    }
                }
            }
        }
        changed
    }
}

impl DependencyGraph for NodeGraph {
    fn differentiate(
        &self,
        delta: Delta,
        params: &DifferentiateParams,
    ) -> Result<DifferentiateResult, GraphError> {
        if delta.is_source_only() && !delta.associations().is_empty() {
            return Err(GraphError::InvalidDelta {
                reason: "source-only delta carries produced nodes".to_string(),
            });
        }
        if !params.calculate_affected {
            return Ok(DifferentiateResult::unaffected(delta));
        }

        let changed = self.changed_nodes(&delta, params);
        let touched = delta.touched();
        let mut affected = BTreeSet::new();
        if !changed.is_empty() {
            for node in self.state.nodes.values() {
                if !node.uses_any(&changed) {
                    continue;
                }
                let Some(units) = self.state.producers.get(&node.id) else {
                    continue;
                };
                affected.extend(
                    units
                        .iter()
                        .filter(|u| !touched.contains(*u) && params.affection_filter.accepts(u))
                        .cloned(),
                );
            }
        }

        let known = self.state.known_units();
        let incremental =
            known == 0 || (affected.len() as f64) <= self.full_rebuild_ratio * known as f64;
        tracing::debug!(
            changed = changed.len(),
            affected = affected.len(),
            known,
            incremental,
            "differentiated delta"
        );
        Ok(DifferentiateResult::new(delta, incremental, affected))
    }

    fn integrate(&mut self, result: DifferentiateResult) -> Result<(), GraphError> {
        let delta = result.into_delta();
        for unit in delta.touched() {
            self.state.remove_unit(&unit);
        }
        for unit in delta.recompiled() {
            self.state.touch_unit(unit);
        }
        for (node, units) in delta.associations() {
            self.state.insert(node.clone(), units);
        }
        if let Some(store) = &self.store {
            store.write(&self.state)?;
        }
        Ok(())
    }

    fn nodes_of(&self, unit: &UnitRef) -> Vec<NodeId> {
        self.state
            .sources
            .get(unit)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    fn clear(&mut self) -> Result<(), GraphError> {
        self.state = GraphState::default();
        match &self.store {
            Some(store) => store.clear(),
            None => Ok(()),
        }
    }
}
