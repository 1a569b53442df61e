//! Diagnostic creation, severity management, and rendering.
//!
//! This crate provides structured [`Diagnostic`] messages with severity levels
//! and codes. The thread-safe [`DiagnosticSink`] accumulates diagnostics during
//! a build, [`RoundSink`] selects per round whether diagnostics go straight to
//! the sink or are held back, and [`TerminalRenderer`] formats them for output.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod round;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use round::RoundSink;
pub use severity::Severity;
pub use sink::DiagnosticSink;
