//! Error types for dependency graph operations.

use std::path::PathBuf;

/// Errors raised by graph differentiation, integration and persistence.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// An I/O error occurred while reading or writing the durable graph.
    #[error("graph I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A serialization or deserialization error occurred.
    #[error("graph serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The graph was handed a result it cannot apply.
    #[error("invalid graph delta: {reason}")]
    InvalidDelta {
        /// Description of the problem.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = GraphError::Io {
            path: PathBuf::from(".kiln/graph.bin"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        let msg = err.to_string();
        assert!(msg.contains("graph I/O error"));
        assert!(msg.contains("graph.bin"));
    }

    #[test]
    fn invalid_delta_display() {
        let err = GraphError::InvalidDelta {
            reason: "source-only delta cannot carry nodes".to_string(),
        };
        assert!(err.to_string().contains("source-only"));
    }
}
