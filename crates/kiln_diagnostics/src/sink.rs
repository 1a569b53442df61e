//! The build-wide diagnostic collector.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;

#[derive(Default)]
struct Collected {
    diagnostics: Vec<Diagnostic>,
    /// Per-severity totals; they survive draining.
    totals: [usize; 3],
}

fn slot(severity: Severity) -> usize {
    match severity {
        Severity::Info => 0,
        Severity::Warning => 1,
        Severity::Error => 2,
    }
}

/// Collects every diagnostic reported during one build invocation.
///
/// Shared by reference between the orchestrator and the compilers it drives;
/// compilers that fan out to worker threads may emit concurrently. Severity
/// totals count everything ever emitted, including diagnostics already
/// drained with [`take_all`](Self::take_all).
#[derive(Default)]
pub struct DiagnosticSink {
    inner: Mutex<Collected>,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Collected> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a diagnostic.
    pub fn emit(&self, diag: Diagnostic) {
        let mut inner = self.lock();
        inner.totals[slot(diag.severity)] += 1;
        inner.diagnostics.push(diag);
    }

    /// Records every diagnostic in `diags` in order, under a single lock.
    pub fn emit_all(&self, diags: impl IntoIterator<Item = Diagnostic>) {
        let mut inner = self.lock();
        for diag in diags {
            inner.totals[slot(diag.severity)] += 1;
            inner.diagnostics.push(diag);
        }
    }

    /// Number of diagnostics of `severity` emitted so far.
    pub fn count(&self, severity: Severity) -> usize {
        self.lock().totals[slot(severity)]
    }

    /// Number of errors emitted so far.
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Returns `true` once any error was emitted.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Removes and returns the collected diagnostics. Totals are kept.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.lock().diagnostics)
    }

    /// Returns a copy of the collected diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().diagnostics.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};

    fn diag(severity: Severity) -> Diagnostic {
        match severity {
            Severity::Error => Diagnostic::error(DiagnosticCode::new(Category::Error, 101), "e"),
            Severity::Warning => {
                Diagnostic::warning(DiagnosticCode::new(Category::Warning, 301), "w")
            }
            Severity::Info => Diagnostic::info(DiagnosticCode::new(Category::Info, 1), "i"),
        }
    }

    #[test]
    fn fresh_sink_has_nothing() {
        let sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn counts_by_severity() {
        let sink = DiagnosticSink::new();
        sink.emit(diag(Severity::Warning));
        sink.emit(diag(Severity::Info));
        sink.emit(diag(Severity::Warning));
        assert!(!sink.has_errors());
        assert_eq!(sink.count(Severity::Warning), 2);
        assert_eq!(sink.count(Severity::Info), 1);

        sink.emit(diag(Severity::Error));
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn emit_all_keeps_order() {
        let sink = DiagnosticSink::new();
        sink.emit_all([diag(Severity::Info), diag(Severity::Error)]);
        let severities: Vec<_> = sink.diagnostics().iter().map(|d| d.severity).collect();
        assert_eq!(severities, vec![Severity::Info, Severity::Error]);
    }

    #[test]
    fn draining_keeps_totals() {
        let sink = DiagnosticSink::new();
        sink.emit(diag(Severity::Error));
        assert_eq!(sink.take_all().len(), 1);
        assert!(sink.take_all().is_empty());
        assert!(sink.has_errors());
    }

    #[test]
    fn concurrent_emitters() {
        let sink = DiagnosticSink::new();
        std::thread::scope(|scope| {
            for worker in 0..4 {
                let sink = &sink;
                scope.spawn(move || {
                    for i in 0..25 {
                        let severity = if (worker + i) % 5 == 0 {
                            Severity::Error
                        } else {
                            Severity::Warning
                        };
                        sink.emit(diag(severity));
                    }
                });
            }
        });
        assert_eq!(sink.diagnostics().len(), 100);
        assert_eq!(sink.error_count() + sink.count(Severity::Warning), 100);
        assert_eq!(sink.error_count(), 20);
    }
}
