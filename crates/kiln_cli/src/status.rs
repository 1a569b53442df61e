//! `kiln status`: what the next build would recompile.

use kiln_build::BuildContext;
use kiln_graph::{DependencyGraph, DifferentiateParams, NodeGraph};
use kiln_snapshot::{Snapshot, SnapshotDelta, SnapshotStore};
use serde::Serialize;

use crate::pipeline::load_project;
use crate::{GlobalArgs, ReportFormat, StatusArgs};

/// The pending work of a project.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Target name.
    pub target: String,
    /// Number of units on disk.
    pub units: usize,
    /// Units changed since the last successful build.
    pub to_recompile: Vec<String>,
    /// Dependents pulled in by the changes.
    pub affected: Vec<String>,
    /// Units removed since the last successful build.
    pub deleted: Vec<String>,
    /// Whether the whole target will be recompiled.
    pub full_rebuild: bool,
}

impl StatusReport {
    /// Returns `true` if a build would do nothing.
    pub fn is_up_to_date(&self) -> bool {
        !self.full_rebuild
            && self.to_recompile.is_empty()
            && self.affected.is_empty()
            && self.deleted.is_empty()
    }

    /// Renders the report for a terminal.
    pub fn to_text(&self) -> String {
        if self.is_up_to_date() {
            return format!("{}: up to date ({} units)\n", self.target, self.units);
        }
        let mut out = format!("{}: {} units\n", self.target, self.units);
        if self.full_rebuild {
            out.push_str("  full rebuild required\n");
        }
        for (label, units) in [
            ("recompile", &self.to_recompile),
            ("affected", &self.affected),
            ("deleted", &self.deleted),
        ] {
            for unit in units {
                out.push_str(&format!("  {label:<10} {unit}\n"));
            }
        }
        out
    }
}

/// Computes the status of a project without compiling anything.
pub fn compute(
    ctx: &BuildContext,
    graph: &NodeGraph,
    previous: &Snapshot,
    current: Snapshot,
) -> Result<StatusReport, Box<dyn std::error::Error>> {
    let units = current.len();
    let missing_state = !previous.is_empty() && graph.is_empty();
    let delta = SnapshotDelta::from_diff(previous, current);
    let to_recompile = delta.sources_to_recompile();

    let mut full_rebuild = ctx.rebuild || missing_state;
    let mut affected = Vec::new();
    if !full_rebuild && delta.has_changes() {
        let graph_delta =
            graph.create_delta(to_recompile.clone(), delta.deleted_sources().clone(), true);
        let params = DifferentiateParams::new(ctx.affection_filter());
        let result = graph.differentiate(graph_delta, &params)?;
        if result.is_incremental() {
            affected = result
                .affected()
                .iter()
                .filter(|u| delta.base().contains(u) && !to_recompile.contains(*u))
                .map(|u| u.to_string())
                .collect();
        } else {
            full_rebuild = true;
        }
    }

    Ok(StatusReport {
        target: ctx.target.clone(),
        units,
        to_recompile: to_recompile.iter().map(|u| u.to_string()).collect(),
        affected,
        deleted: delta.deleted_sources().iter().map(|u| u.to_string()).collect(),
        full_rebuild,
    })
}

/// Runs the `kiln status` command.
pub fn run(args: &StatusArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let ctx = BuildContext::from_config(&project.config, &project.root);

    let current = project.scan()?;
    let previous = SnapshotStore::new(&ctx.state_dir).load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "previous snapshot unreadable, treating as empty");
        Snapshot::empty()
    });
    let graph = NodeGraph::open(&ctx.state_dir, project.config.build.full_rebuild_ratio);
    let report = compute(&ctx, &graph, &previous, current)?;

    match args.format {
        ReportFormat::Text => print!("{}", report.to_text()),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_common::{Digest, UnitRef};
    use kiln_graph::{Node, NodeId};
    use std::collections::BTreeSet;
    use std::path::Path;

    fn snap(entries: &[(&str, &str)]) -> Snapshot {
        entries
            .iter()
            .map(|(u, d)| (UnitRef::new(*u), Digest::from_string(*d)))
            .collect()
    }

    fn graph_with_user() -> NodeGraph {
        let mut graph = NodeGraph::in_memory(1.0);
        let units: BTreeSet<UnitRef> =
            ["src/a.kd", "src/b.kd"].into_iter().map(UnitRef::new).collect();
        let mut delta = graph.create_delta(units, BTreeSet::new(), false);
        delta.associate(
            Node::new(NodeId::new("A.out"), Digest::from_string("sa")),
            BTreeSet::from([UnitRef::new("src/a.kd")]),
        );
        delta.associate(
            Node::new(NodeId::new("B.out"), Digest::from_string("sb"))
                .with_usages([NodeId::new("A.out")]),
            BTreeSet::from([UnitRef::new("src/b.kd")]),
        );
        let params = DifferentiateParams::new(Default::default()).with_calculate_affected(false);
        let result = graph.differentiate(delta, &params).unwrap();
        graph.integrate(result).unwrap();
        graph
    }

    #[test]
    fn up_to_date_project() {
        let ctx = BuildContext::new("app", Path::new("/p"));
        let previous = snap(&[("src/a.kd", "1"), ("src/b.kd", "2")]);
        let report = compute(&ctx, &graph_with_user(), &previous, previous.clone()).unwrap();
        assert!(report.is_up_to_date());
        assert!(report.to_text().contains("up to date"));
    }

    #[test]
    fn deletion_pulls_in_users() {
        let ctx = BuildContext::new("app", Path::new("/p"));
        let previous = snap(&[("src/a.kd", "1"), ("src/b.kd", "2")]);
        let current = snap(&[("src/b.kd", "2")]);
        let report = compute(&ctx, &graph_with_user(), &previous, current).unwrap();
        assert_eq!(report.deleted, vec!["src/a.kd"]);
        assert_eq!(report.affected, vec!["src/b.kd"]);
        assert!(report.to_recompile.is_empty());
        assert!(report.to_text().contains("affected   src/b.kd"));
    }

    #[test]
    fn missing_graph_means_full_rebuild() {
        let ctx = BuildContext::new("app", Path::new("/p"));
        let previous = snap(&[("src/a.kd", "1")]);
        let report = compute(&ctx, &NodeGraph::in_memory(1.0), &previous, previous.clone()).unwrap();
        assert!(report.full_rebuild);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["full_rebuild"], true);
    }
}
