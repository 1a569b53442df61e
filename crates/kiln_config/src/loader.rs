//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Name of the configuration file at the project root.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Loads and validates a `kiln.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
        path: config_path.clone(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
        reason: e.to_string(),
    })?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.trim().is_empty() {
        return Err(ConfigError::MissingField {
            field: "project.name",
        });
    }
    if config.build.sources.is_empty() {
        return Err(ConfigError::MissingField {
            field: "build.sources",
        });
    }
    let ratio = config.build.full_rebuild_ratio;
    if !(ratio > 0.0 && ratio <= 1.0) {
        return Err(ConfigError::Invalid {
            field: "build.full_rebuild_ratio",
            reason: format!("must be in (0, 1], got {ratio}"),
        });
    }
    if config.build.output_dir == config.build.state_dir {
        return Err(ConfigError::Invalid {
            field: "build.state_dir",
            reason: "must differ from build.output_dir".to_string(),
        });
    }
    Ok(())
}
