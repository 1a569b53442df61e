//! The round loop.
//!
//! One [`RoundOrchestrator`] value drives exactly one build invocation:
//!
//! 1. Compute the initial [`SnapshotDelta`] from the previous snapshot, or a
//!    full-rebuild delta after clearing persisted state.
//! 2. Widen the initial scope with a source-only differentiation, so
//!    dependents of changed or deleted units are compiled in the first round.
//! 3. Compile round after round. Each error-free round is differentiated and
//!    integrated into the dependency graph, and the units it reports as
//!    affected form the next round. A first round with errors is retried once
//!    with the widened scope; any other round with errors fails the build.
//! 4. Persist the snapshot view of the final delta, whatever the outcome.

use std::collections::BTreeSet;
use std::time::Instant;

use kiln_common::UnitRef;
use kiln_diagnostics::{Diagnostic, DiagnosticSink, RoundSink};
use kiln_graph::{DependencyGraph, DifferentiateParams, Node};
use kiln_snapshot::{Snapshot, SnapshotDelta, SnapshotStore};

use crate::artifacts::ArtifactStore;
use crate::codes;
use crate::compiler::{CompileRequest, CompileStatus, Toolchain};
use crate::context::BuildContext;
use crate::error::BuildError;
use crate::outcome::{BuildOutcome, BuildReport, BuildStats, ForcedRebuild};
use crate::output::OutputSink;

/// How a round ended.
enum RoundDecision {
    /// The round was integrated; continue with the next delta.
    Continue(SnapshotDelta),
    /// The first round failed; the current delta was widened in place.
    Retry,
    Failed,
    Cancelled,
}

#[derive(Clone, Copy)]
enum Stage {
    PrePass,
    Main,
}

/// What one stage's compilers left behind.
struct StageRun {
    produced: Vec<(Node, BTreeSet<UnitRef>)>,
    /// A compiler returned [`CompileStatus::Error`].
    errored: bool,
}

/// Drives one incremental build of one target.
///
/// The cumulative affected set lives in this value, so a new orchestrator
/// must be constructed for every invocation. [`run`](Self::run) consumes it.
pub struct RoundOrchestrator<'a> {
    ctx: &'a BuildContext,
    graph: &'a mut dyn DependencyGraph,
    artifacts: &'a mut dyn ArtifactStore,
    toolchain: &'a mut Toolchain,
    diagnostics: &'a DiagnosticSink,
    cumulative_affected: BTreeSet<UnitRef>,
    /// Set once the pre-pass ran without errors; until then every round runs it.
    pre_pass_done: bool,
    stats: BuildStats,
}

impl<'a> RoundOrchestrator<'a> {
    /// Creates an orchestrator for one invocation.
    pub fn new(
        ctx: &'a BuildContext,
        graph: &'a mut dyn DependencyGraph,
        artifacts: &'a mut dyn ArtifactStore,
        toolchain: &'a mut Toolchain,
        diagnostics: &'a DiagnosticSink,
    ) -> Self {
        Self {
            ctx,
            graph,
            artifacts,
            toolchain,
            diagnostics,
            cumulative_affected: BTreeSet::new(),
            pre_pass_done: false,
            stats: BuildStats::default(),
        }
    }

    /// Builds the target against `current`, the digests of the units on disk.
    ///
    /// Never fails: unexpected errors are reported to the diagnostic sink and
    /// yield [`BuildOutcome::Failed`]. The snapshot is saved to `store` on
    /// every path.
    pub fn run(mut self, store: &SnapshotStore, current: Snapshot) -> BuildReport {
        let span = tracing::info_span!("build", target = %self.ctx.target);
        let _enter = span.enter();
        let started = Instant::now();

        let (mut delta, reset) = self.initial_delta(store, current);
        let outcome = match self.build(&mut delta, store, reset) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(error = %err, "build aborted");
                self.diagnostics
                    .emit(Diagnostic::error(codes::BUILD_FAILURE, err.to_string()));
                BuildOutcome::Failed
            }
        };

        if let Err(err) = store.save(&delta.as_snapshot()) {
            tracing::warn!(path = %store.path().display(), error = %err, "could not save snapshot");
            self.diagnostics.emit(Diagnostic::warning(
                codes::SNAPSHOT_SAVE_FAILED,
                format!("could not save build snapshot: {err}"),
            ));
        }

        self.stats.elapsed = started.elapsed();
        tracing::info!(
            %outcome,
            rounds = self.stats.rounds,
            units = self.stats.units_compiled,
            "build finished"
        );
        BuildReport {
            outcome,
            stats: self.stats,
        }
    }

    /// Returns the starting delta and whether persisted state must be reset.
    fn initial_delta(&mut self, store: &SnapshotStore, current: Snapshot) -> (SnapshotDelta, bool) {
        if self.ctx.rebuild {
            self.stats.force(ForcedRebuild::Requested);
            return (SnapshotDelta::full_rebuild(current), true);
        }

        let (previous, unreadable) = match store.load() {
            Ok(previous) => (previous, false),
            Err(err) => {
                tracing::warn!(path = %store.path().display(), error = %err, "discarding unreadable snapshot");
                self.diagnostics.emit(Diagnostic::warning(
                    codes::SNAPSHOT_LOAD_FAILED,
                    format!("could not load previous build snapshot: {err}"),
                ));
                (Snapshot::empty(), true)
            }
        };

        // Without the previous snapshot, units deleted since the last build
        // cannot be told apart from units never built.
        let graph_empty = self.graph.is_empty();
        if (unreadable && !graph_empty) || (!previous.is_empty() && graph_empty) {
            tracing::info!(unreadable, graph_empty, "build state incomplete, forcing full rebuild");
            self.diagnostics.emit(Diagnostic::info(
                codes::MISSING_STATE,
                "build state is missing or corrupted, forcing full rebuild",
            ));
            self.stats.force(ForcedRebuild::MissingState);
            return (SnapshotDelta::full_rebuild(current), true);
        }

        (SnapshotDelta::from_diff(&previous, current), false)
    }

    fn build(
        &mut self,
        delta: &mut SnapshotDelta,
        store: &SnapshotStore,
        reset: bool,
    ) -> Result<BuildOutcome, BuildError> {
        if reset {
            self.reset_state(store)?;
        } else if delta.has_changes() {
            if self.ctx.cancel.is_cancelled() {
                return Ok(BuildOutcome::Cancelled);
            }
            self.expand_initial_scope(delta)?;
        }

        let mut round = 0;
        while delta.has_changes() {
            if self.ctx.cancel.is_cancelled() {
                tracing::info!(round, "build cancelled");
                return Ok(BuildOutcome::Cancelled);
            }
            round += 1;
            match self.run_round(delta, round)? {
                RoundDecision::Continue(next) => *delta = next,
                RoundDecision::Retry => {}
                RoundDecision::Failed => return Ok(BuildOutcome::Failed),
                RoundDecision::Cancelled => return Ok(BuildOutcome::Cancelled),
            }
        }
        Ok(BuildOutcome::Success)
    }

    fn reset_state(&mut self, store: &SnapshotStore) -> Result<(), BuildError> {
        if let Err(err) = store.clear() {
            self.diagnostics.emit(Diagnostic::warning(
                codes::STATE_RESET_FAILED,
                format!("could not remove previous build snapshot: {err}"),
            ));
        }
        self.graph.clear()?;
        self.artifacts.clear()?;
        tracing::debug!("cleared persisted build state");
        Ok(())
    }

    /// Adds dependents of the changed and deleted units before compiling anything.
    fn expand_initial_scope(&mut self, delta: &mut SnapshotDelta) -> Result<(), BuildError> {
        let graph_delta = self.graph.create_delta(
            delta.sources_to_recompile(),
            delta.deleted_sources().clone(),
            true,
        );
        let params = DifferentiateParams::new(self.ctx.affection_filter());
        let result = self.graph.differentiate(graph_delta, &params)?;

        if !result.is_incremental() {
            self.force_full(delta, ForcedRebuild::NonIncremental);
            return Ok(());
        }

        let mut added = 0;
        for unit in result.affected() {
            if delta.base().contains(unit) && delta.mark_recompile(unit.clone()) {
                added += 1;
            }
        }
        tracing::debug!(added, "expanded initial scope");

        if delta
            .sources_to_recompile()
            .iter()
            .any(|u| self.ctx.is_module_descriptor(u))
        {
            self.force_full(delta, ForcedRebuild::ModuleDescriptor);
        }
        Ok(())
    }

    fn run_round(&mut self, delta: &mut SnapshotDelta, round: u32) -> Result<RoundDecision, BuildError> {
        let span = tracing::debug_span!("round", n = round);
        let _enter = span.enter();

        let diagnostics = self.diagnostics;
        let sink = if round == 1 {
            RoundSink::postponed(diagnostics)
        } else {
            RoundSink::pass_through(diagnostics)
        };

        let decision = self.compile_round(delta, round, &sink);

        let released = sink.flush();
        if released > 0 {
            tracing::debug!(released, "released postponed diagnostics");
        }
        decision
    }

    fn compile_round(
        &mut self,
        delta: &mut SnapshotDelta,
        round: u32,
        sink: &RoundSink<'_>,
    ) -> Result<RoundDecision, BuildError> {
        let to_recompile = delta.sources_to_recompile();
        let deleted = delta.deleted_sources().clone();
        let full = delta.is_recompile_all();

        self.stats.rounds += 1;
        self.stats.units_compiled += to_recompile.len();
        tracing::debug!(
            round,
            units = to_recompile.len(),
            deleted = deleted.len(),
            full,
            "round started"
        );

        let mut stage_errored = false;
        if !self.pre_pass_done {
            let Some(pre) =
                self.run_stage(Stage::PrePass, &to_recompile, &deleted, round, sink)?
            else {
                return Ok(RoundDecision::Cancelled);
            };
            stage_errored = pre.errored || sink.has_errors();
            self.pre_pass_done = !stage_errored;
        }

        let mut produced = Vec::new();
        if !stage_errored && !sink.has_errors() {
            self.delete_stale_artifacts(&to_recompile, &deleted);
            let Some(main) =
                self.run_stage(Stage::Main, &to_recompile, &deleted, round, sink)?
            else {
                return Ok(RoundDecision::Cancelled);
            };
            stage_errored = main.errored;
            produced = main.produced;
        }
        let errors = stage_errored || sink.has_errors();

        let mut graph_delta = self.graph.create_delta(to_recompile, deleted, false);
        for (node, units) in produced {
            graph_delta.associate(node, units);
        }

        if self.ctx.cancel.is_cancelled() {
            tracing::info!(round, "build cancelled before differentiation");
            return Ok(RoundDecision::Cancelled);
        }

        let params = DifferentiateParams::new(self.ctx.affection_filter())
            .with_calculate_affected(!full)
            .with_errors(errors);
        let result = self.graph.differentiate(graph_delta, &params)?;

        let mut next = SnapshotDelta::new(delta.base().clone());
        if !result.is_incremental() {
            self.force_full(&mut next, ForcedRebuild::NonIncremental);
        } else if !full {
            for unit in result.affected() {
                if next.base().contains(unit) {
                    next.mark_recompile(unit.clone());
                }
            }
            if next
                .sources_to_recompile()
                .iter()
                .any(|u| self.ctx.is_module_descriptor(u))
            {
                self.force_full(&mut next, ForcedRebuild::ModuleDescriptor);
            }
        }

        if !errors {
            if !next.is_recompile_all() {
                self.guard_cycle(&mut next);
            }
            self.graph.integrate(result)?;
            tracing::debug!(
                round,
                affected = next.sources_to_recompile().len(),
                full = next.is_recompile_all(),
                "round integrated"
            );
            return Ok(RoundDecision::Continue(next));
        }

        if full || !next.has_changes() {
            tracing::debug!(round, "round failed with no wider scope to try");
            return Ok(RoundDecision::Failed);
        }
        delta.absorb(&next);
        if round == 1 {
            tracing::info!(
                units = delta.sources_to_recompile().len(),
                "first round failed, retrying with widened scope"
            );
            Ok(RoundDecision::Retry)
        } else {
            Ok(RoundDecision::Failed)
        }
    }

    /// Forces a full recompilation when a round reports only units already seen as affected.
    fn guard_cycle(&mut self, next: &mut SnapshotDelta) {
        let affected = next.sources_to_recompile();
        if affected.is_empty() {
            return;
        }
        let before = self.cumulative_affected.len();
        self.cumulative_affected.extend(affected);
        if self.cumulative_affected.len() == before {
            self.force_full(next, ForcedRebuild::CycleGuard);
        }
    }

    fn force_full(&mut self, delta: &mut SnapshotDelta, reason: ForcedRebuild) {
        if delta.is_recompile_all() {
            return;
        }
        delta.mark_recompile_all();
        self.stats.force(reason);
        tracing::info!(%reason, "forcing full recompilation");
        self.diagnostics.emit(Diagnostic::info(
            codes::FULL_REBUILD_FORCED,
            format!("recompiling all of '{}': {reason}", self.ctx.target),
        ));
    }

    fn delete_stale_artifacts(&mut self, to_recompile: &BTreeSet<UnitRef>, deleted: &BTreeSet<UnitRef>) {
        let mut removed = 0;
        for unit in to_recompile.iter().chain(deleted) {
            for id in self.graph.nodes_of(unit) {
                if self.artifacts.delete_entry(id.as_str()) {
                    removed += 1;
                }
            }
        }
        self.stats.artifacts_deleted += removed;
        if removed > 0 {
            tracing::debug!(removed, "removed stale artifacts");
        }
    }

    /// Runs one stage's compilers. Returns `None` if a compiler cancelled.
    ///
    /// Every compiler runs even after another one reported an error. Artifacts
    /// from the pre-pass are written but not tracked in the graph.
    fn run_stage(
        &mut self,
        stage: Stage,
        units: &BTreeSet<UnitRef>,
        deleted: &BTreeSet<UnitRef>,
        round: u32,
        sink: &RoundSink<'_>,
    ) -> Result<Option<StageRun>, BuildError> {
        let Toolchain {
            pre_pass,
            main,
            instrumenters,
        } = &mut *self.toolchain;
        let compilers = match stage {
            Stage::PrePass => pre_pass,
            Stage::Main => main,
        };

        let mut output = OutputSink::new(&mut *self.artifacts, instrumenters);
        let mut errored = false;
        for compiler in compilers.iter_mut() {
            let request = CompileRequest {
                units: units.iter().filter(|u| compiler.can_compile(u)).cloned().collect(),
                deleted,
                context: self.ctx,
                round,
            };
            if request.units.is_empty() && deleted.is_empty() {
                continue;
            }
            let status = compiler.compile(&request, sink, &mut output)?;
            tracing::debug!(
                compiler = compiler.name(),
                units = request.units.len(),
                ?status,
                "compiler finished"
            );
            match status {
                CompileStatus::Ok => {}
                CompileStatus::Error => errored = true,
                CompileStatus::Cancel => {
                    tracing::info!(compiler = compiler.name(), "compiler requested cancellation");
                    return Ok(None);
                }
            }
        }

        self.stats.artifacts_written += output.produced().len();
        self.stats.artifacts_deleted += output.deleted_count();
        let produced = match stage {
            Stage::PrePass => Vec::new(),
            Stage::Main => output.into_produced(),
        };
        Ok(Some(StageRun { produced, errored }))
    }
}
