//! `kiln clean`: remove build state and artifacts.

use std::path::Path;

use kiln_build::{ArtifactStore, DirArtifactStore};

use crate::pipeline::load_project;
use crate::GlobalArgs;

/// Removes `dir` and everything below it. A missing directory is not an error.
fn remove_dir(dir: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(format!("failed to remove {}: {e}", dir.display()).into()),
    }
}

/// Runs the `kiln clean` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;

    let state_dir = project.state_dir();
    let removed_state = remove_dir(&state_dir)?;
    DirArtifactStore::new(&project.output_dir()).clear()?;

    if !global.quiet {
        if removed_state {
            eprintln!("     Removed {}", state_dir.display());
        }
        eprintln!("     Cleaned {}", project.config.project.name);
    }
    Ok(0)
}
