//! Error types for snapshot persistence and source scanning.

use std::path::PathBuf;

/// Errors raised while reading or writing snapshots.
///
/// Callers treat load failures as "no previous state" rather than aborting
/// the build; the error exists so the failure can be reported.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// An I/O error occurred while reading or writing a snapshot or source file.
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The persisted snapshot is truncated or malformed.
    #[error("corrupt snapshot: {reason}")]
    Corrupt {
        /// Description of the problem.
        reason: String,
    },
}
