//! Errors raised while reading `kiln.toml`.

use std::path::PathBuf;

/// Why a project configuration could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        /// The file that was read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the expected layout.
    #[error("failed to parse configuration: {reason}")]
    Parse {
        /// Parser message, including the location.
        reason: String,
    },

    /// A required value is absent or empty.
    #[error("missing required field `{field}`")]
    MissingField {
        /// Dotted key of the field.
        field: &'static str,
    },

    /// A value is present but unusable.
    #[error("invalid `{field}`: {reason}")]
    Invalid {
        /// Dotted key of the field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_file() {
        let err = ConfigError::Io {
            path: PathBuf::from("/work/app/kiln.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("failed to read configuration /work/app/kiln.toml"));
        assert!(msg.ends_with("no such file"));
    }

    #[test]
    fn field_errors_quote_the_key() {
        let missing = ConfigError::MissingField {
            field: "project.name",
        };
        assert_eq!(missing.to_string(), "missing required field `project.name`");

        let invalid = ConfigError::Invalid {
            field: "build.full_rebuild_ratio",
            reason: "must be in (0, 1], got 2".to_string(),
        };
        assert_eq!(
            invalid.to_string(),
            "invalid `build.full_rebuild_ratio`: must be in (0, 1], got 2"
        );
    }
}
