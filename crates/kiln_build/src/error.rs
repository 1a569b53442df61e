//! Error types for the build loop and its collaborators.

use std::path::PathBuf;

use kiln_common::InternalError;
use kiln_graph::GraphError;
use kiln_snapshot::SnapshotError;

/// Errors that abort a build invocation.
///
/// These never escape [`RoundOrchestrator::run`](crate::RoundOrchestrator::run):
/// they are reported as an error diagnostic and the build fails.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The dependency graph failed to differentiate, integrate or reset.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Snapshot persistence failed where it is not recoverable.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// An artifact could not be written or removed.
    #[error("artifact I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A compiler failed outside of reporting diagnostics.
    #[error("compiler '{compiler}' failed: {reason}")]
    Compiler {
        /// Name of the failing compiler.
        compiler: String,
        /// Description of the failure.
        reason: String,
    },

    /// An instrumenter rejected an artifact.
    #[error("instrumenter '{instrumenter}' failed on {artifact}: {reason}")]
    Instrumenter {
        /// Name of the failing instrumenter.
        instrumenter: String,
        /// The artifact being instrumented.
        artifact: String,
        /// Description of the failure.
        reason: String,
    },

    /// A broken internal invariant.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
