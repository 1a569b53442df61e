//! Build outcomes and statistics.

use std::fmt;
use std::time::Duration;

/// How a build invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Every round compiled cleanly and nothing is left to recompile.
    Success,
    /// Compilation errors or an unexpected failure stopped the build.
    Failed,
    /// Cancellation was requested by the caller or a compiler.
    Cancelled,
}

impl BuildOutcome {
    /// Returns `true` for [`BuildOutcome::Success`].
    pub fn is_success(self) -> bool {
        self == BuildOutcome::Success
    }
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildOutcome::Success => write!(f, "success"),
            BuildOutcome::Failed => write!(f, "failed"),
            BuildOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Why the whole target was recompiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedRebuild {
    /// The caller asked for a rebuild.
    Requested,
    /// The dependency graph could not bound the change.
    NonIncremental,
    /// Rounds kept reporting units that were already recompiled.
    CycleGuard,
    /// A module descriptor was affected.
    ModuleDescriptor,
    /// The previous snapshot existed but the graph state did not.
    MissingState,
}

impl fmt::Display for ForcedRebuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForcedRebuild::Requested => write!(f, "rebuild requested"),
            ForcedRebuild::NonIncremental => write!(f, "change too wide for incremental analysis"),
            ForcedRebuild::CycleGuard => write!(f, "affected units did not converge"),
            ForcedRebuild::ModuleDescriptor => write!(f, "module descriptor affected"),
            ForcedRebuild::MissingState => write!(f, "build state missing or corrupted"),
        }
    }
}

/// Counters collected over one build invocation.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Rounds started.
    pub rounds: u32,
    /// Sum of the per-round recompilation scope sizes.
    pub units_compiled: usize,
    /// Artifacts registered by compilers.
    pub artifacts_written: usize,
    /// Stale artifacts removed.
    pub artifacts_deleted: usize,
    /// The first reason the whole target was recompiled, if any.
    pub forced_rebuild: Option<ForcedRebuild>,
    /// Wall-clock time of the invocation.
    pub elapsed: Duration,
}

impl BuildStats {
    /// Records a forced rebuild, keeping the first reason.
    pub fn force(&mut self, reason: ForcedRebuild) {
        self.forced_rebuild.get_or_insert(reason);
    }
}

/// What [`RoundOrchestrator::run`](crate::RoundOrchestrator::run) returns.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// How the build ended.
    pub outcome: BuildOutcome,
    /// Counters for the invocation.
    pub stats: BuildStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_forced_reason_wins() {
        let mut stats = BuildStats::default();
        stats.force(ForcedRebuild::NonIncremental);
        stats.force(ForcedRebuild::CycleGuard);
        assert_eq!(stats.forced_rebuild, Some(ForcedRebuild::NonIncremental));
    }

    #[test]
    fn outcome_display() {
        assert_eq!(BuildOutcome::Cancelled.to_string(), "cancelled");
        assert!(BuildOutcome::Success.is_success());
        assert!(!BuildOutcome::Failed.is_success());
    }
}
