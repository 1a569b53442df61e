//! Per-round diagnostic routing.
//!
//! The orchestrator picks one [`RoundSink`] per round: rounds after the first
//! pass diagnostics straight through, while the first round holds them back
//! until the round has decided whether it retries with a wider scope.

use crate::diagnostic::Diagnostic;
use crate::sink::DiagnosticSink;

/// Diagnostic sink used for the duration of a single build round.
pub enum RoundSink<'a> {
    /// Diagnostics go straight to the build's sink.
    PassThrough {
        /// The build's sink.
        target: &'a DiagnosticSink,
        /// Error count of `target` when the round started.
        errors_before: usize,
    },
    /// Diagnostics are buffered until [`flush`](RoundSink::flush) is called.
    Postponed {
        /// The build's sink, receiving the buffer on flush.
        target: &'a DiagnosticSink,
        /// Diagnostics held back during the round.
        buffer: DiagnosticSink,
    },
}

impl<'a> RoundSink<'a> {
    /// Creates a sink that forwards every diagnostic immediately.
    pub fn pass_through(target: &'a DiagnosticSink) -> Self {
        RoundSink::PassThrough {
            target,
            errors_before: target.error_count(),
        }
    }

    /// Creates a sink that buffers diagnostics until flushed.
    pub fn postponed(target: &'a DiagnosticSink) -> Self {
        RoundSink::Postponed {
            target,
            buffer: DiagnosticSink::new(),
        }
    }

    /// Reports a diagnostic for this round.
    pub fn emit(&self, diag: Diagnostic) {
        match self {
            RoundSink::PassThrough { target, .. } => target.emit(diag),
            RoundSink::Postponed { buffer, .. } => buffer.emit(diag),
        }
    }

    /// Returns `true` if an error was reported during this round.
    ///
    /// Errors reported before the round started are not counted.
    pub fn has_errors(&self) -> bool {
        match self {
            RoundSink::PassThrough {
                target,
                errors_before,
            } => target.error_count() > *errors_before,
            RoundSink::Postponed { buffer, .. } => buffer.has_errors(),
        }
    }

    /// Returns `true` for the buffering variant.
    pub fn is_postponed(&self) -> bool {
        matches!(self, RoundSink::Postponed { .. })
    }

    /// Number of diagnostics currently held back.
    pub fn pending(&self) -> usize {
        match self {
            RoundSink::PassThrough { .. } => 0,
            RoundSink::Postponed { buffer, .. } => buffer.diagnostics().len(),
        }
    }

    /// Drains buffered diagnostics into the build's sink.
    ///
    /// Returns how many diagnostics were forwarded. A no-op for pass-through sinks.
    pub fn flush(&self) -> usize {
        match self {
            RoundSink::PassThrough { .. } => 0,
            RoundSink::Postponed { target, buffer } => {
                let held = buffer.take_all();
                let count = held.len();
                target.emit_all(held);
                count
            }
        }
    }
}
