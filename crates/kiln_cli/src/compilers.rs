//! Built-in compilers for directory projects.
//!
//! [`ResourceCopier`] runs as a pre-pass and copies resource units verbatim.
//! [`DeclCompiler`] compiles `.kd` declaration files, a line-oriented format:
//!
//! ```text
//! # comment
//! use Other          every artifact of this file depends on Other.out
//! def Name body...   produces Name.out; its signature is the digest of body
//! error message      reports a compile error
//! ```

use std::collections::{BTreeMap, BTreeSet};

use kiln_build::{
    BuildError, CompileRequest, CompileStatus, CompiledArtifact, Compiler, OutputSink,
};
use kiln_common::{Digest, UnitRef};
use kiln_diagnostics::{Category, Diagnostic, DiagnosticCode, RoundSink};
use kiln_graph::NodeId;

/// Extension of declaration units.
pub const DECL_EXTENSION: &str = "kd";

/// Extension of declaration artifacts.
pub const ARTIFACT_EXTENSION: &str = "out";

/// A unit reported an error directive.
pub const USER_ERROR: DiagnosticCode = DiagnosticCode::new(Category::Error, 101);
/// A name was defined twice in one unit.
pub const DUPLICATE_DEF: DiagnosticCode = DiagnosticCode::new(Category::Error, 102);
/// A line did not start with a known directive.
pub const UNKNOWN_DIRECTIVE: DiagnosticCode = DiagnosticCode::new(Category::Error, 103);
/// A unit could not be read.
pub const UNREADABLE_UNIT: DiagnosticCode = DiagnosticCode::new(Category::Error, 104);
/// A unit defines nothing.
pub const EMPTY_UNIT: DiagnosticCode = DiagnosticCode::new(Category::Warning, 101);

/// Artifact path of the declaration `name`.
pub fn artifact_path(name: &str) -> String {
    format!("{name}.{ARTIFACT_EXTENSION}")
}

/// Copies resource units to the output under their unit path.
pub struct ResourceCopier {
    extensions: Vec<String>,
}

impl ResourceCopier {
    /// Creates a copier for units with the given extensions.
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    fn is_resource(&self, unit: &UnitRef) -> bool {
        unit.extension()
            .is_some_and(|ext| self.extensions.iter().any(|want| want == ext))
    }
}

impl Compiler for ResourceCopier {
    fn name(&self) -> &str {
        "resources"
    }

    fn can_compile(&self, unit: &UnitRef) -> bool {
        self.is_resource(unit)
    }

    fn compile(
        &mut self,
        request: &CompileRequest<'_>,
        diagnostics: &RoundSink<'_>,
        output: &mut OutputSink<'_>,
    ) -> Result<CompileStatus, BuildError> {
        for unit in request.deleted.iter().filter(|u| self.is_resource(u)) {
            output.delete(unit.as_str());
        }

        let mut status = CompileStatus::Ok;
        for unit in &request.units {
            match std::fs::read(unit.to_path(&request.context.project_root)) {
                Ok(bytes) => output.register(CompiledArtifact::new(
                    unit.as_str(),
                    bytes,
                    BTreeSet::from([unit.clone()]),
                ))?,
                Err(e) => {
                    diagnostics.emit(
                        Diagnostic::error(UNREADABLE_UNIT, format!("cannot read resource: {e}"))
                            .in_unit(unit.clone()),
                    );
                    status = CompileStatus::Error;
                }
            }
        }
        Ok(status)
    }
}

/// One parsed declaration unit.
#[derive(Debug, Default, PartialEq)]
struct DeclUnit {
    defs: BTreeMap<String, String>,
    uses: BTreeSet<String>,
    errors: usize,
}

/// Compiles `.kd` declaration units into one artifact per `def`.
#[derive(Default)]
pub struct DeclCompiler;

impl DeclCompiler {
    /// Creates the compiler.
    pub fn new() -> Self {
        Self
    }

    /// Parses `text`, reporting problems for `unit` to `diagnostics`.
    fn parse(unit: &UnitRef, text: &str, diagnostics: &RoundSink<'_>) -> DeclUnit {
        let mut parsed = DeclUnit::default();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (directive, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            let rest = rest.trim();
            let problem = match directive {
                "def" => {
                    let (name, body) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                    if name.is_empty() {
                        Some((UNKNOWN_DIRECTIVE, "`def` needs a name".to_string()))
                    } else if parsed.defs.contains_key(name) {
                        Some((DUPLICATE_DEF, format!("`{name}` is defined more than once")))
                    } else {
                        parsed.defs.insert(name.to_string(), body.trim().to_string());
                        None
                    }
                }
                "use" if rest.is_empty() => {
                    Some((UNKNOWN_DIRECTIVE, "`use` needs a name".to_string()))
                }
                "use" => {
                    parsed.uses.extend(rest.split_whitespace().map(str::to_string));
                    None
                }
                "error" => Some((USER_ERROR, rest.to_string())),
                other => Some((UNKNOWN_DIRECTIVE, format!("unknown directive `{other}`"))),
            };
            if let Some((code, message)) = problem {
                diagnostics.emit(
                    Diagnostic::error(code, message)
                        .in_unit(unit.clone())
                        .at_line(idx as u32 + 1),
                );
                parsed.errors += 1;
            }
        }
        parsed
    }
}

impl Compiler for DeclCompiler {
    fn name(&self) -> &str {
        "decl"
    }

    fn can_compile(&self, unit: &UnitRef) -> bool {
        unit.extension() == Some(DECL_EXTENSION)
    }

    fn compile(
        &mut self,
        request: &CompileRequest<'_>,
        diagnostics: &RoundSink<'_>,
        output: &mut OutputSink<'_>,
    ) -> Result<CompileStatus, BuildError> {
        let mut errors = 0;
        for unit in &request.units {
            let text = match std::fs::read_to_string(unit.to_path(&request.context.project_root)) {
                Ok(text) => text,
                Err(e) => {
                    diagnostics.emit(
                        Diagnostic::error(UNREADABLE_UNIT, format!("cannot read unit: {e}"))
                            .in_unit(unit.clone()),
                    );
                    errors += 1;
                    continue;
                }
            };

            let parsed = Self::parse(unit, &text, diagnostics);
            errors += parsed.errors;
            if parsed.defs.is_empty() && parsed.errors == 0 {
                diagnostics.emit(
                    Diagnostic::warning(EMPTY_UNIT, "unit defines nothing").in_unit(unit.clone()),
                );
            }
            let usages: Vec<NodeId> = parsed
                .uses
                .iter()
                .map(|name| NodeId::new(artifact_path(name)))
                .collect();
            for (name, body) in parsed.defs {
                let signature = Digest::of_bytes(body.as_bytes());
                let mut bytes = body.into_bytes();
                bytes.push(b'\n');
                output.register(
                    CompiledArtifact::new(artifact_path(&name), bytes, BTreeSet::from([unit.clone()]))
                        .with_signature(signature)
                        .with_usages(usages.iter().cloned()),
                )?;
            }
        }
        tracing::debug!(units = request.units.len(), errors, "declarations compiled");

        if errors > 0 {
            Ok(CompileStatus::Error)
        } else {
            Ok(CompileStatus::Ok)
        }
    }
}
