//! Collaborator traits for compilers and instrumenters.

use std::collections::BTreeSet;

use kiln_common::UnitRef;
use kiln_diagnostics::RoundSink;

use crate::context::BuildContext;
use crate::error::BuildError;
use crate::output::OutputSink;

/// Result of one compiler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStatus {
    /// The compiler finished; diagnostics tell whether it reported errors.
    Ok,
    /// The compiler failed. The round fails even if no error diagnostic was
    /// emitted.
    Error,
    /// The compiler asks for the whole build to stop.
    Cancel,
}

/// The units a compiler is asked to process in one round.
pub struct CompileRequest<'a> {
    /// Units this compiler accepted, in order.
    pub units: Vec<UnitRef>,
    /// Units removed since the last successful round.
    pub deleted: &'a BTreeSet<UnitRef>,
    /// The build invocation.
    pub context: &'a BuildContext,
    /// One-based round number.
    pub round: u32,
}

/// A compiler run by the build loop.
///
/// Pre-pass compilers run on the first round, before the main compilers,
/// and again on the retry of a first round whose pre-pass failed. Main compilers run every round and report produced artifacts
/// through the [`OutputSink`].
pub trait Compiler {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Returns `true` if this compiler handles `unit`.
    fn can_compile(&self, unit: &UnitRef) -> bool;

    /// Compiles the requested units.
    ///
    /// Compilation problems are reported to `diagnostics`; `Err` is reserved
    /// for failures of the compiler itself.
    fn compile(
        &mut self,
        request: &CompileRequest<'_>,
        diagnostics: &RoundSink<'_>,
        output: &mut OutputSink<'_>,
    ) -> Result<CompileStatus, BuildError>;
}

/// Post-processes artifact bytes before they are written.
pub trait Instrumenter {
    /// Short name used in error messages.
    fn name(&self) -> &str;

    /// Returns `true` if this instrumenter rewrites the artifact at `path`.
    fn applies_to(&self, path: &str) -> bool;

    /// Transforms the artifact bytes.
    fn instrument(&mut self, path: &str, bytes: Vec<u8>) -> Result<Vec<u8>, BuildError>;
}

/// The compilers and instrumenters of one target.
#[derive(Default)]
pub struct Toolchain {
    pub(crate) pre_pass: Vec<Box<dyn Compiler>>,
    pub(crate) main: Vec<Box<dyn Compiler>>,
    pub(crate) instrumenters: Vec<Box<dyn Instrumenter>>,
}

impl Toolchain {
    /// Creates an empty toolchain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a compiler run once before the first round's main compilers.
    pub fn with_pre_pass(mut self, compiler: impl Compiler + 'static) -> Self {
        self.pre_pass.push(Box::new(compiler));
        self
    }

    /// Adds a compiler run every round.
    pub fn with_compiler(mut self, compiler: impl Compiler + 'static) -> Self {
        self.main.push(Box::new(compiler));
        self
    }

    /// Adds an instrumenter applied to every produced artifact it accepts.
    pub fn with_instrumenter(mut self, instrumenter: impl Instrumenter + 'static) -> Self {
        self.instrumenters.push(Box::new(instrumenter));
        self
    }

    /// Number of pre-pass and main compilers.
    pub fn compiler_count(&self) -> usize {
        self.pre_pass.len() + self.main.len()
    }
}
