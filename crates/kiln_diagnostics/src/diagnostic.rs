//! Structured diagnostic messages with severity, codes and unit locations.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use kiln_common::UnitRef;
use serde::{Deserialize, Serialize};

/// A structured diagnostic message reported during a build.
///
/// Compiler diagnostics usually carry the unit (and line) they refer to;
/// orchestration diagnostics such as persistence warnings carry neither.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The code identifying the kind of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// The unit this diagnostic refers to, if any.
    pub unit: Option<UnitRef>,
    /// 1-based line within the unit, if known.
    pub line: Option<u32>,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
}

impl Diagnostic {
    fn with_severity(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            unit: None,
            line: None,
            notes: Vec::new(),
        }
    }

    /// Creates a new error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message)
    }

    /// Creates a new warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message)
    }

    /// Creates a new informational diagnostic.
    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Info, code, message)
    }

    /// Attaches the unit this diagnostic refers to.
    pub fn in_unit(mut self, unit: UnitRef) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Attaches a 1-based line number.
    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}
