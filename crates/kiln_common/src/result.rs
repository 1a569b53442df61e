//! Common result and error types for the kiln workspace.

/// The standard result type for fallible internal operations.
///
/// `Err` indicates a broken internal invariant (a bug in kiln), not a
/// user-facing problem. User-facing problems are reported through the
/// diagnostic sink and the operation still completes.
pub type KilnResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in kiln, not a problem with the project.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
