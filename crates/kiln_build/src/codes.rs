//! Diagnostic codes reported by the build loop itself.
//!
//! Compilers report their own codes; the build loop only reports scope
//! decisions, persistence degradation and unexpected failures.

use kiln_diagnostics::{Category, DiagnosticCode};

/// A full recompilation was forced by the build loop.
pub const FULL_REBUILD_FORCED: DiagnosticCode = DiagnosticCode::new(Category::Info, 1);

/// Build state was missing or corrupted, forcing a full rebuild.
pub const MISSING_STATE: DiagnosticCode = DiagnosticCode::new(Category::Info, 2);

/// The previous snapshot could not be loaded.
pub const SNAPSHOT_LOAD_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Warning, 301);

/// The new snapshot could not be saved.
pub const SNAPSHOT_SAVE_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Warning, 302);

/// Persisted state could not be fully cleared before a rebuild.
pub const STATE_RESET_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Warning, 303);

/// An unexpected failure aborted the build.
pub const BUILD_FAILURE: DiagnosticCode = DiagnosticCode::new(Category::Error, 900);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render() {
        assert_eq!(BUILD_FAILURE.to_string(), "E900");
        assert_eq!(SNAPSHOT_SAVE_FAILED.to_string(), "W302");
        assert_eq!(MISSING_STATE.to_string(), "I002");
    }
}
