//! Per-invocation build parameters.

use std::path::{Path, PathBuf};

use kiln_common::UnitRef;
use kiln_config::ProjectConfig;
use kiln_graph::UnitFilter;

use crate::cancel::CancelToken;

/// Everything the build loop needs to know about one invocation.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Name of the target (chunk) being built.
    pub target: String,
    /// Whether the caller requested a full rebuild.
    pub rebuild: bool,
    /// Root directory units are relative to.
    pub project_root: PathBuf,
    /// Directory holding persisted build state.
    pub state_dir: PathBuf,
    /// Directory receiving artifacts.
    pub output_dir: PathBuf,
    /// Unit path prefixes that never count as affected.
    pub library_paths: Vec<String>,
    /// File stem identifying module descriptor units.
    pub module_descriptor: String,
    /// Cancellation flag observed at round and differentiation checkpoints.
    pub cancel: CancelToken,
}

impl BuildContext {
    /// Creates a context with default directories under `project_root`.
    pub fn new(target: impl Into<String>, project_root: &Path) -> Self {
        Self {
            target: target.into(),
            rebuild: false,
            project_root: project_root.to_path_buf(),
            state_dir: project_root.join(".kiln"),
            output_dir: project_root.join("out"),
            library_paths: Vec::new(),
            module_descriptor: "module-info".to_string(),
            cancel: CancelToken::new(),
        }
    }

    /// Creates a context from a loaded `kiln.toml`.
    pub fn from_config(config: &ProjectConfig, project_root: &Path) -> Self {
        let build = &config.build;
        Self {
            target: config.project.name.clone(),
            rebuild: false,
            project_root: project_root.to_path_buf(),
            state_dir: project_root.join(&build.state_dir),
            output_dir: project_root.join(&build.output_dir),
            library_paths: build.library_paths.clone(),
            module_descriptor: build.module_descriptor.clone(),
            cancel: CancelToken::new(),
        }
    }

    /// Sets the rebuild flag.
    pub fn with_rebuild(mut self, rebuild: bool) -> Self {
        self.rebuild = rebuild;
        self
    }

    /// Uses `token` for cancellation.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Returns `true` if `unit` is a module descriptor source.
    pub fn is_module_descriptor(&self, unit: &UnitRef) -> bool {
        !self.module_descriptor.is_empty() && unit.file_stem() == self.module_descriptor
    }

    /// Filter excluding library-only units from affected sets.
    pub fn affection_filter(&self) -> UnitFilter {
        UnitFilter::excluding(self.library_paths.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_config::load_config_from_str;

    #[test]
    fn from_config_resolves_dirs() {
        let config = load_config_from_str(
            r#"
            [project]
            name = "app"

            [build]
            output_dir = "build/out"
            library_paths = ["vendor"]
            "#,
        )
        .unwrap();
        let ctx = BuildContext::from_config(&config, Path::new("/work/app"));
        assert_eq!(ctx.target, "app");
        assert_eq!(ctx.output_dir, Path::new("/work/app/build/out"));
        assert_eq!(ctx.state_dir, Path::new("/work/app/.kiln"));
        assert!(!ctx.affection_filter().accepts(&UnitRef::new("vendor/x.kd")));
    }

    #[test]
    fn module_descriptor_by_stem() {
        let ctx = BuildContext::new("app", Path::new("/p"));
        assert!(ctx.is_module_descriptor(&UnitRef::new("src/module-info.kd")));
        assert!(!ctx.is_module_descriptor(&UnitRef::new("src/module.kd")));
    }

    #[test]
    fn empty_descriptor_matches_nothing() {
        let mut ctx = BuildContext::new("app", Path::new("/p"));
        ctx.module_descriptor.clear();
        assert!(!ctx.is_module_descriptor(&UnitRef::new("src/.kd")));
    }
}
