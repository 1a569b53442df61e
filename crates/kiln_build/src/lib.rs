//! The incremental build loop.
//!
//! A [`RoundOrchestrator`] drives one build invocation for one target: it
//! diffs the previous [`Snapshot`](kiln_snapshot::Snapshot) against the units
//! on disk, compiles in rounds until the dependency graph reports nothing
//! further affected, and persists the resulting snapshot for the next
//! invocation whatever the outcome.
//!
//! Compilers, instrumenters and the artifact store are supplied by the
//! embedding driver through the [`Compiler`], [`Instrumenter`] and
//! [`ArtifactStore`] traits.

#![warn(missing_docs)]

pub mod artifacts;
pub mod cancel;
pub mod codes;
pub mod compiler;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod output;

pub use artifacts::{ArtifactStore, DirArtifactStore, MemoryArtifactStore};
pub use cancel::CancelToken;
pub use compiler::{CompileRequest, CompileStatus, Compiler, Instrumenter, Toolchain};
pub use context::BuildContext;
pub use error::BuildError;
pub use orchestrator::RoundOrchestrator;
pub use outcome::{BuildOutcome, BuildReport, BuildStats, ForcedRebuild};
pub use output::{CompiledArtifact, OutputSink};
