//! Shared helpers for CLI commands.
//!
//! Project root resolution, configuration loading, source scanning and
//! diagnostic rendering used by `build`, `status` and `clean`.

use std::path::{Path, PathBuf};

use kiln_config::{ProjectConfig, CONFIG_FILE};
use kiln_diagnostics::{Diagnostic, DiagnosticRenderer, Severity, TerminalRenderer};
use kiln_snapshot::{Snapshot, SourceScanner};

use crate::GlobalArgs;

/// A loaded project: its root directory and configuration.
pub struct Project {
    /// Directory containing `kiln.toml`.
    pub root: PathBuf,
    /// The parsed configuration.
    pub config: ProjectConfig,
}

impl Project {
    /// Directory holding the persisted snapshot and graph.
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(&self.config.build.state_dir)
    }

    /// Directory receiving artifacts.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.config.build.output_dir)
    }

    /// Digests the project's units as they exist now.
    pub fn scan(&self) -> Result<Snapshot, Box<dyn std::error::Error>> {
        let build = &self.config.build;
        let mut extensions = build.extensions.clone();
        if !extensions.is_empty() {
            extensions.extend(build.resources.iter().cloned());
        }
        let scanner = SourceScanner::new(&self.root)
            .with_source_roots(build.sources.clone())
            .with_extensions(extensions);
        Ok(scanner.scan()?)
    }
}

/// Walks up from `start` looking for the nearest directory containing `kiln.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root from `--config`, or by searching upwards from the current directory.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")))
        } else {
            Ok(p)
        }
    } else {
        find_project_root(&std::env::current_dir()?)
    }
}

/// Resolves the project root and loads its configuration.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    let root = resolve_project_root(global)?;
    let config = kiln_config::load_config(&root)?;
    Ok(Project { root, config })
}

/// Renders diagnostics to stderr. Info diagnostics are shown only when verbose.
///
/// Returns the number of diagnostics rendered.
pub fn render_diagnostics(diagnostics: &[Diagnostic], global: &GlobalArgs) -> usize {
    let renderer = TerminalRenderer::new(global.color);
    let mut rendered = 0;
    for diag in diagnostics {
        let shown = match diag.severity {
            Severity::Error => true,
            Severity::Warning => !global.quiet,
            Severity::Info => global.verbose && !global.quiet,
        };
        if shown {
            eprint!("{}", renderer.render(diag));
            rendered += 1;
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MINIMAL: &str = "[project]\nname = \"t\"\n";

    #[test]
    fn find_project_root_in_current_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), MINIMAL).unwrap();
        assert_eq!(find_project_root(tmp.path()).unwrap(), tmp.path());
    }

    #[test]
    fn find_project_root_in_parent() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), MINIMAL).unwrap();
        let sub = tmp.path().join("src").join("nested");
        fs::create_dir_all(&sub).unwrap();
        assert_eq!(find_project_root(&sub).unwrap(), tmp.path());
    }

    #[test]
    fn find_project_root_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = find_project_root(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("could not find kiln.toml"));
    }

    #[test]
    fn scan_includes_resources_when_extensions_set() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "[project]\nname = \"t\"\n[build]\nextensions = [\"kd\"]\nresources = [\"txt\"]\n",
        )
        .unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/a.kd"), "def A x").unwrap();
        fs::write(tmp.path().join("src/b.txt"), "hi").unwrap();
        fs::write(tmp.path().join("src/c.md"), "skip").unwrap();

        let project = Project {
            root: tmp.path().to_path_buf(),
            config: kiln_config::load_config(tmp.path()).unwrap(),
        };
        let snapshot = project.scan().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot.contains(&kiln_common::UnitRef::new("src/c.md")));
    }
}
