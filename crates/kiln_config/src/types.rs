//! Configuration types deserialized from `kiln.toml`.

use serde::Deserialize;

/// The top-level project configuration parsed from `kiln.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Build settings.
    #[serde(default)]
    pub build: BuildSettings,
}

/// Core project metadata required in every `kiln.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name, used as the build target name.
    pub name: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
}

/// Settings controlling what is built and where build state lives.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Source roots, relative to the project directory, scanned for units.
    pub sources: Vec<String>,
    /// Unit file extensions to include. Empty means every file.
    pub extensions: Vec<String>,
    /// Extensions handled by the resource copier rather than the compiler.
    pub resources: Vec<String>,
    /// Artifact output directory.
    pub output_dir: String,
    /// Directory holding the persisted snapshot and dependency graph.
    pub state_dir: String,
    /// Unit path prefixes that never count as affected (library-only code).
    pub library_paths: Vec<String>,
    /// File stem identifying module descriptor units.
    pub module_descriptor: String,
    /// Affected/known unit ratio above which the graph gives up on incremental analysis.
    pub full_rebuild_ratio: f64,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            sources: vec!["src".to_string()],
            extensions: Vec::new(),
            resources: Vec::new(),
            output_dir: "out".to_string(),
            state_dir: ".kiln".to_string(),
            library_paths: Vec::new(),
            module_descriptor: "module-info".to_string(),
            full_rebuild_ratio: 0.75,
        }
    }
}
