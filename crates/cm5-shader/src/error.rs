//! Error types for compiler startup, compilation, and the program registry.

use std::error::Error;
use std::fmt;

use cm5_core::ShaderId;

use crate::compiler::Target;

// ── CompilerInitError ──────────────────────────────────────────────

/// Errors from [`ShaderCompiler::startup`](crate::ShaderCompiler::startup).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompilerInitError {
    /// The requested backend cannot be brought up in this process.
    BackendUnavailable {
        /// Requested target.
        target: Target,
        /// Why the backend is unavailable.
        reason: String,
    },
    /// The configuration is unusable.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for CompilerInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackendUnavailable { target, reason } => {
                write!(f, "{target} shader backend unavailable: {reason}")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid compiler config: {reason}"),
        }
    }
}

impl Error for CompilerInitError {}

// ── CompileError ───────────────────────────────────────────────────

/// Stage of compilation that rejected a shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// WGSL syntax or type error.
    Parse,
    /// The module parsed but failed validation.
    Validation,
    /// The module does not expose exactly one usable `@compute` entry point.
    EntryPoint,
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::Validation => write!(f, "validation"),
            Self::EntryPoint => write!(f, "entry point"),
        }
    }
}

/// Line and column of a diagnostic, both 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column (in characters).
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A shader that failed to compile.
///
/// Carries the one-line `message`, the position when the front end
/// reported one, and a multi-line `rendered` diagnostic with source
/// context suitable for printing to a terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileError {
    /// Logical path of the failing source.
    pub path: String,
    /// Which stage rejected it.
    pub kind: CompileErrorKind,
    /// Short description of the first error.
    pub message: String,
    /// Where the error was reported, if known.
    pub location: Option<SourceLocation>,
    /// Diagnostic rendered with the offending source line.
    pub rendered: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{}:{loc}: {} error: {}",
                self.path, self.kind, self.message
            ),
            None => write!(f, "{}: {} error: {}", self.path, self.kind, self.message),
        }
    }
}

impl Error for CompileError {}

// ── RegistryError ──────────────────────────────────────────────────

/// Errors from populating a [`ProgramRegistry`](crate::ProgramRegistry).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Two programs resolved to the same identifier.
    Duplicate {
        /// The clashing identifier.
        id: ShaderId,
        /// Path of the program that was rejected.
        path: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate { id, path } => {
                write!(f, "duplicate shader id '{id}' (from {path})")
            }
        }
    }
}

impl Error for RegistryError {}
