//! Durable graph state.
//!
//! The graph is written as a single binary file under the state directory:
//! a little-endian header length, a bincode [`GraphHeader`] carrying magic
//! bytes, format version and a payload checksum, then the bincode payload.
//! Reads are fail-safe: a missing, truncated or mismatched file loads as
//! `None` and the caller starts from an empty graph.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use kiln_common::{ContentHash, UnitRef};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::node::{Node, NodeId};

/// File name of the persisted graph within the state directory.
pub const GRAPH_FILE: &str = "graph.bin";

const GRAPH_MAGIC: [u8; 4] = *b"KGRF";

/// Increment on breaking changes to the header or payload format.
const GRAPH_FORMAT_VERSION: u32 = 1;

/// Header prepended to the persisted graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphHeader {
    magic: [u8; 4],
    format_version: u32,
    checksum: ContentHash,
}

/// The authoritative graph contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    /// Every known node by id.
    pub nodes: BTreeMap<NodeId, Node>,
    /// Nodes produced by each compiled unit; empty for units that produced none.
    pub sources: BTreeMap<UnitRef, BTreeSet<NodeId>>,
    /// Units that contributed to each node.
    pub producers: BTreeMap<NodeId, BTreeSet<UnitRef>>,
}

impl GraphState {
    /// Returns `true` if no unit has ever been integrated.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.nodes.is_empty()
    }

    /// Number of integrated units, including those that produced nothing.
    pub fn known_units(&self) -> usize {
        self.sources.len()
    }

    /// Records `unit` as compiled, even if it produced no nodes.
    pub fn touch_unit(&mut self, unit: &UnitRef) {
        self.sources.entry(unit.clone()).or_default();
    }

    /// Removes every association of `unit`, dropping nodes left without producers.
    pub fn remove_unit(&mut self, unit: &UnitRef) {
        let Some(ids) = self.sources.remove(unit) else {
            return;
        };
        for id in ids {
            let orphaned = match self.producers.get_mut(&id) {
                Some(units) => {
                    units.remove(unit);
                    units.is_empty()
                }
                None => true,
            };
            if orphaned {
                self.producers.remove(&id);
                self.nodes.remove(&id);
            }
        }
    }

    /// Records `node` as produced by `units`, replacing any previous node with the same id.
    pub fn insert(&mut self, node: Node, units: &BTreeSet<UnitRef>) {
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        for unit in units {
            self.sources.entry(unit.clone()).or_default().insert(id.clone());
        }
        self.producers.entry(id).or_default().extend(units.iter().cloned());
    }
}

/// Reads and writes [`GraphState`] under a state directory.
pub struct GraphStore {
    state_dir: PathBuf,
}

impl GraphStore {
    /// Creates a store rooted at `state_dir`.
    pub fn new(state_dir: &Path) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
        }
    }

    /// Path of the persisted graph file.
    pub fn path(&self) -> PathBuf {
        self.state_dir.join(GRAPH_FILE)
    }

    /// Writes `state`, replacing any previous file.
    pub fn write(&self, state: &GraphState) -> Result<(), GraphError> {
        std::fs::create_dir_all(&self.state_dir).map_err(|e| GraphError::Io {
            path: self.state_dir.clone(),
            source: e,
        })?;

        let payload = bincode::serde::encode_to_vec(state, bincode::config::standard())
            .map_err(|e| GraphError::Serialization {
                reason: e.to_string(),
            })?;
        let header = GraphHeader {
            magic: GRAPH_MAGIC,
            format_version: GRAPH_FORMAT_VERSION,
            checksum: ContentHash::from_bytes(&payload),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| GraphError::Serialization {
                reason: e.to_string(),
            })?;

        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&payload);

        let path = self.path();
        let tmp = path.with_extension("bin.tmp");
        std::fs::write(&tmp, &output).map_err(|e| GraphError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| GraphError::Io { path, source: e })
    }

    /// Reads the persisted state, or `None` if it is missing or invalid.
    pub fn read(&self) -> Option<GraphState> {
        let raw = std::fs::read(self.path()).ok()?;
        if raw.len() < 4 {
            return None;
        }

        let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
        if raw.len() < 4 + header_len {
            return None;
        }

        let header: GraphHeader =
            bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
                .ok()?
                .0;
        if header.magic != GRAPH_MAGIC || header.format_version != GRAPH_FORMAT_VERSION {
            return None;
        }

        let payload = &raw[4 + header_len..];
        if ContentHash::from_bytes(payload) != header.checksum {
            return None;
        }

        bincode::serde::decode_from_slice(payload, bincode::config::standard())
            .ok()
            .map(|(state, _)| state)
    }

    /// Removes the persisted graph. A missing file is not an error.
    pub fn clear(&self) -> Result<(), GraphError> {
        let path = self.path();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GraphError::Io { path, source: e }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_common::Digest;

    fn units(names: &[&str]) -> BTreeSet<UnitRef> {
        names.iter().map(|n| UnitRef::new(*n)).collect()
    }

    fn sample_state() -> GraphState {
        let mut state = GraphState::default();
        state.insert(
            Node::new(NodeId::new("A.out"), Digest::from_string("a1")),
            &units(&["src/a.kd"]),
        );
        state.insert(
            Node::new(NodeId::new("B.out"), Digest::from_string("b1"))
                .with_usages([NodeId::new("A.out")]),
            &units(&["src/b.kd"]),
        );
        state
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::new(dir.path());
        let state = sample_state();
        store.write(&state).unwrap();
        assert_eq!(store.read(), Some(state));
    }

    #[test]
    fn read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GraphStore::new(dir.path()).read().is_none());
    }

    #[test]
    fn read_corrupt_payload_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::new(dir.path());
        store.write(&sample_state()).unwrap();

        let mut raw = std::fs::read(store.path()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        std::fs::write(store.path(), &raw).unwrap();

        assert!(store.read().is_none());
    }

    #[test]
    fn read_truncated_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::new(dir.path());
        std::fs::write(store.path(), [1u8, 0]).unwrap();
        assert!(store.read().is_none());
    }

    #[test]
    fn clear_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::new(dir.path());
        store.clear().unwrap();
        store.write(&sample_state()).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn remove_unit_keeps_shared_nodes() {
        let mut state = GraphState::default();
        state.insert(
            Node::new(NodeId::new("Shared.out"), Digest::from_string("s")),
            &units(&["src/x.kd", "src/y.kd"]),
        );
        state.remove_unit(&UnitRef::new("src/x.kd"));
        assert!(state.nodes.contains_key(&NodeId::new("Shared.out")));
        state.remove_unit(&UnitRef::new("src/y.kd"));
        assert!(state.is_empty());
        assert!(state.producers.is_empty());
    }
}
