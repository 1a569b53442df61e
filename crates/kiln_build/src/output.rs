//! Collects artifacts produced by compilers during a round.

use std::collections::BTreeSet;

use kiln_common::{Digest, InternalError, UnitRef};
use kiln_graph::{Node, NodeId};

use crate::artifacts::ArtifactStore;
use crate::compiler::Instrumenter;
use crate::error::BuildError;

/// One artifact reported by a compiler.
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    /// Output-relative path, also the graph node id.
    pub path: String,
    /// Artifact content before instrumentation.
    pub bytes: Vec<u8>,
    /// Units that contributed to the artifact.
    pub sources: BTreeSet<UnitRef>,
    /// Fingerprint of what other units can observe.
    pub signature: Digest,
    /// Artifacts this one depends on.
    pub usages: BTreeSet<NodeId>,
}

impl CompiledArtifact {
    /// Creates an artifact whose signature is the digest of its bytes.
    pub fn new(path: impl Into<String>, bytes: Vec<u8>, sources: BTreeSet<UnitRef>) -> Self {
        let signature = Digest::of_bytes(&bytes);
        Self {
            path: path.into(),
            bytes,
            sources,
            signature,
            usages: BTreeSet::new(),
        }
    }

    /// Overrides the signature, e.g. with a digest of the public surface only.
    pub fn with_signature(mut self, signature: Digest) -> Self {
        self.signature = signature;
        self
    }

    /// Records artifacts this one depends on.
    pub fn with_usages(mut self, usages: impl IntoIterator<Item = NodeId>) -> Self {
        self.usages.extend(usages);
        self
    }
}

/// Receives artifacts from compilers, instruments them and writes them out.
///
/// Every registered artifact is remembered together with its contributing
/// units so the round can hand them to the dependency graph.
pub struct OutputSink<'a> {
    store: &'a mut dyn ArtifactStore,
    instrumenters: &'a mut [Box<dyn Instrumenter>],
    produced: Vec<(Node, BTreeSet<UnitRef>)>,
    deleted: usize,
}

impl<'a> OutputSink<'a> {
    /// Creates a sink writing to `store`.
    pub fn new(store: &'a mut dyn ArtifactStore, instrumenters: &'a mut [Box<dyn Instrumenter>]) -> Self {
        Self {
            store,
            instrumenters,
            produced: Vec::new(),
            deleted: 0,
        }
    }

    /// Instruments and writes `artifact`, recording it for the graph.
    ///
    /// An artifact without contributing units cannot be tracked and is
    /// rejected as an internal error.
    pub fn register(&mut self, artifact: CompiledArtifact) -> Result<(), BuildError> {
        if artifact.sources.is_empty() {
            return Err(InternalError::new(format!(
                "artifact '{}' has no contributing units",
                artifact.path
            ))
            .into());
        }

        let mut bytes = artifact.bytes;
        for instrumenter in self.instrumenters.iter_mut() {
            if instrumenter.applies_to(&artifact.path) {
                bytes = instrumenter.instrument(&artifact.path, bytes)?;
            }
        }
        self.store.write_entry(&artifact.path, &bytes)?;

        let node = Node::new(NodeId::new(artifact.path), artifact.signature)
            .with_usages(artifact.usages);
        self.produced.push((node, artifact.sources));
        Ok(())
    }

    /// Removes a previously written artifact that is no longer produced.
    pub fn delete(&mut self, path: &str) -> bool {
        let removed = self.store.delete_entry(path);
        if removed {
            self.deleted += 1;
        }
        removed
    }

    /// Artifacts registered so far with their contributing units.
    pub fn produced(&self) -> &[(Node, BTreeSet<UnitRef>)] {
        &self.produced
    }

    /// Number of artifacts removed through [`delete`](Self::delete).
    pub fn deleted_count(&self) -> usize {
        self.deleted
    }

    /// Consumes the sink, yielding the registered artifacts.
    pub fn into_produced(self) -> Vec<(Node, BTreeSet<UnitRef>)> {
        self.produced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::MemoryArtifactStore;

    struct Banner;

    impl Instrumenter for Banner {
        fn name(&self) -> &str {
            "banner"
        }

        fn applies_to(&self, path: &str) -> bool {
            path.ends_with(".out")
        }

        fn instrument(&mut self, _path: &str, bytes: Vec<u8>) -> Result<Vec<u8>, BuildError> {
            let mut out = b"// kiln\n".to_vec();
            out.extend(bytes);
            Ok(out)
        }
    }

    fn sources(names: &[&str]) -> BTreeSet<UnitRef> {
        names.iter().map(|n| UnitRef::new(*n)).collect()
    }

    #[test]
    fn register_instruments_and_records() {
        let mut store = MemoryArtifactStore::new();
        let mut instrumenters: Vec<Box<dyn Instrumenter>> = vec![Box::new(Banner)];
        let mut sink = OutputSink::new(&mut store, &mut instrumenters);

        sink.register(
            CompiledArtifact::new("A.out", b"body".to_vec(), sources(&["src/a.kd"]))
                .with_usages([NodeId::new("B.out")]),
        )
        .unwrap();
        sink.register(CompiledArtifact::new("a.txt", b"raw".to_vec(), sources(&["src/a.txt"])))
            .unwrap();

        let produced = sink.into_produced();
        assert_eq!(produced.len(), 2);
        assert_eq!(produced[0].0.signature, Digest::of_bytes(b"body"));
        assert!(produced[0].0.usages.contains(&NodeId::new("B.out")));
        assert_eq!(store.get("A.out"), Some(&b"// kiln\nbody"[..]));
        assert_eq!(store.get("a.txt"), Some(&b"raw"[..]));
    }

    #[test]
    fn register_without_sources_is_internal_error() {
        let mut store = MemoryArtifactStore::new();
        let mut instrumenters: Vec<Box<dyn Instrumenter>> = Vec::new();
        let mut sink = OutputSink::new(&mut store, &mut instrumenters);
        let err = sink
            .register(CompiledArtifact::new("A.out", Vec::new(), BTreeSet::new()))
            .unwrap_err();
        assert!(matches!(err, BuildError::Internal(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn delete_counts_removals() {
        let mut store = MemoryArtifactStore::new();
        store.write_entry("old.out", b"x").unwrap();
        let mut instrumenters: Vec<Box<dyn Instrumenter>> = Vec::new();
        let mut sink = OutputSink::new(&mut store, &mut instrumenters);
        assert!(sink.delete("old.out"));
        assert!(!sink.delete("old.out"));
        assert_eq!(sink.deleted_count(), 1);
    }
}
