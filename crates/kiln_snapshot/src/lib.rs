//! Per-unit content snapshots and the change tracking built on them.
//!
//! A [`Snapshot`] records one digest per compilation unit for one build
//! generation. [`SnapshotDelta`] layers the in-progress "what must be
//! recompiled" state on top of a snapshot, [`SnapshotStore`] persists snapshots
//! between invocations, and [`SourceScanner`] digests the units on disk.

#![warn(missing_docs)]

pub mod delta;
pub mod error;
pub mod scan;
pub mod snapshot;
pub mod store;

pub use delta::SnapshotDelta;
pub use error::SnapshotError;
pub use scan::SourceScanner;
pub use snapshot::Snapshot;
pub use store::{read_snapshot, write_snapshot, SnapshotStore, SNAPSHOT_FILE};
