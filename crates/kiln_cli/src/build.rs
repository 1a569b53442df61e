//! `kiln build`: incremental build of the current project.

use kiln_build::{BuildContext, BuildOutcome, DirArtifactStore, RoundOrchestrator, Toolchain};
use kiln_config::ProjectConfig;
use kiln_diagnostics::DiagnosticSink;
use kiln_graph::NodeGraph;
use kiln_snapshot::SnapshotStore;

use crate::compilers::{DeclCompiler, ResourceCopier};
use crate::pipeline::{load_project, render_diagnostics};
use crate::{BuildArgs, GlobalArgs};

/// Exit code reported when the build was cancelled.
pub const EXIT_CANCELLED: i32 = 130;

/// The compilers used for every directory project.
pub fn toolchain_for(config: &ProjectConfig) -> Toolchain {
    Toolchain::new()
        .with_pre_pass(ResourceCopier::new(config.build.resources.clone()))
        .with_compiler(DeclCompiler::new())
}

/// Maps a build outcome to the process exit code.
pub fn exit_code(outcome: BuildOutcome) -> i32 {
    match outcome {
        BuildOutcome::Success => 0,
        BuildOutcome::Failed => 1,
        BuildOutcome::Cancelled => EXIT_CANCELLED,
    }
}

/// Runs the `kiln build` command.
///
/// Returns exit code 0 on success, 1 on failure and 130 when cancelled.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let ctx = BuildContext::from_config(&project.config, &project.root).with_rebuild(args.rebuild);

    if !global.quiet {
        eprintln!("   Building {}", ctx.target);
    }

    let current = project.scan()?;
    let store = SnapshotStore::new(&ctx.state_dir);
    let mut graph = NodeGraph::open(&ctx.state_dir, project.config.build.full_rebuild_ratio);
    let mut artifacts = DirArtifactStore::new(&ctx.output_dir);
    let mut toolchain = toolchain_for(&project.config);
    let sink = DiagnosticSink::new();

    let report = RoundOrchestrator::new(&ctx, &mut graph, &mut artifacts, &mut toolchain, &sink)
        .run(&store, current);

    render_diagnostics(&sink.diagnostics(), global);

    let stats = &report.stats;
    if !global.quiet {
        match report.outcome {
            BuildOutcome::Success if stats.rounds == 0 => {
                eprintln!("    Finished {} (up to date)", ctx.target);
            }
            BuildOutcome::Success => eprintln!(
                "    Finished {}: {} unit(s) in {} round(s), {:.2?}",
                ctx.target, stats.units_compiled, stats.rounds, stats.elapsed
            ),
            BuildOutcome::Failed => {
                eprintln!("      Failed {} after {} round(s)", ctx.target, stats.rounds)
            }
            BuildOutcome::Cancelled => eprintln!("   Cancelled {}", ctx.target),
        }
        if global.verbose {
            if let Some(reason) = stats.forced_rebuild {
                eprintln!("        Full {reason}");
            }
            eprintln!(
                "   Artifacts {} written, {} removed",
                stats.artifacts_written, stats.artifacts_deleted
            );
        }
    }

    Ok(exit_code(report.outcome))
}
