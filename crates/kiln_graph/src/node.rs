//! Graph nodes: one per produced artifact descriptor.

use std::collections::BTreeSet;
use std::fmt;

use kiln_common::Digest;
use serde::{Deserialize, Serialize};

/// Identifier of a produced artifact, its path within the output.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node id from an artifact path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the artifact path.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// A produced artifact descriptor.
///
/// The signature fingerprints whatever other units can observe of the
/// artifact; a unit using this node must be recompiled when it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// The artifact this node describes.
    pub id: NodeId,
    /// Fingerprint of the artifact's externally visible shape.
    pub signature: Digest,
    /// Nodes this artifact depends on.
    pub usages: BTreeSet<NodeId>,
}

impl Node {
    /// Creates a node with no usages.
    pub fn new(id: NodeId, signature: Digest) -> Self {
        Self {
            id,
            signature,
            usages: BTreeSet::new(),
        }
    }

    /// Adds the nodes this artifact depends on.
    pub fn with_usages(mut self, usages: impl IntoIterator<Item = NodeId>) -> Self {
        self.usages.extend(usages);
        self
    }

    /// Returns `true` if this node depends on any of `ids`.
    pub fn uses_any(&self, ids: &BTreeSet<NodeId>) -> bool {
        // iterate the smaller side
        if self.usages.len() <= ids.len() {
            self.usages.iter().any(|u| ids.contains(u))
        } else {
            ids.iter().any(|id| self.usages.contains(id))
        }
    }
}
