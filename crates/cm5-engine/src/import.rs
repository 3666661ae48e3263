//! Loading and compiling the engine's shader set.
//!
//! [`import_shaders`] drives the loader over every required path,
//! compiles each source, and collects every failure instead of stopping
//! at the first. Either the whole registry is returned, or nothing.

use std::error::Error;
use std::fmt;

use cm5_shader::{CompileError, CompilerSession, ProgramRegistry, RegistryError, ShaderSource};

use crate::executor::BindError;
use crate::loader::{LoadError, ShaderLoader};

/// Shaders every simulator needs, in load order.
pub const REQUIRED_SHADERS: [&str; 4] = [
    "shaders/growth.wgsl",
    "shaders/division.wgsl",
    "shaders/contact.wgsl",
    "shaders/integrate.wgsl",
];

// ── Errors ─────────────────────────────────────────────────────────

/// Why a shader's source could not be obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShaderLoadError {
    /// The loader reported a failure.
    Loader(LoadError),
    /// The loader returned empty or whitespace-only text.
    Empty,
}

impl fmt::Display for ShaderLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loader(e) => write!(f, "{e}"),
            Self::Empty => write!(f, "source is empty"),
        }
    }
}

impl Error for ShaderLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Loader(e) => Some(e),
            Self::Empty => None,
        }
    }
}

/// One shader that could not be made ready.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShaderFailure {
    /// The source could not be loaded.
    Load {
        /// Logical path of the shader.
        path: String,
        /// What went wrong.
        error: ShaderLoadError,
    },
    /// The source did not compile.
    Compile(CompileError),
    /// The program could not be registered.
    Registry(RegistryError),
    /// The program could not be linked into the executor.
    Bind(BindError),
}

impl ShaderFailure {
    /// The shader the failure is about: its path, or its id for bind
    /// and registry failures.
    pub fn shader(&self) -> &str {
        match self {
            Self::Load { path, .. } => path,
            Self::Compile(e) => &e.path,
            Self::Registry(RegistryError::Duplicate { path, .. }) => path,
            Self::Bind(e) => e.shader.as_str(),
        }
    }
}

impl fmt::Display for ShaderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { path, error } => write!(f, "{path}: {error}"),
            Self::Compile(e) => write!(f, "{e}"),
            Self::Registry(e) => write!(f, "{e}"),
            Self::Bind(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ShaderFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load { error, .. } => Some(error),
            Self::Compile(e) => Some(e),
            Self::Registry(e) => Some(e),
            Self::Bind(e) => Some(e),
        }
    }
}

/// Every shader failure found while preparing a simulator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportError {
    /// Failures in load order. Never empty.
    pub failures: Vec<ShaderFailure>,
}

impl ImportError {
    /// Names of the failing shaders, in load order.
    pub fn failing_shaders(&self) -> Vec<&str> {
        self.failures.iter().map(ShaderFailure::shader).collect()
    }

    /// Whether `shader` (a path or id) is among the failures.
    pub fn names(&self, shader: &str) -> bool {
        self.failures.iter().any(|f| f.shader() == shader)
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} shader(s) failed to import", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  {failure}")?;
        }
        Ok(())
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.failures.first().map(|f| f as &(dyn Error + 'static))
    }
}

// ── Import ─────────────────────────────────────────────────────────

/// Load, compile, and register every shader in `paths`.
///
/// The loader is called exactly once per path, in order, even after a
/// failure, so a single error report covers the whole set.
pub fn import_shaders(
    session: &CompilerSession,
    paths: &[&str],
    loader: &mut dyn ShaderLoader,
) -> Result<ProgramRegistry, ImportError> {
    let mut registry = ProgramRegistry::new();
    let mut failures = Vec::new();

    for &path in paths {
        let text = match loader.load(path) {
            Ok(text) => text,
            Err(e) => {
                failures.push(ShaderFailure::Load {
                    path: path.to_string(),
                    error: ShaderLoadError::Loader(e),
                });
                continue;
            }
        };
        let source = ShaderSource::new(path, text);
        if source.is_blank() {
            failures.push(ShaderFailure::Load {
                path: path.to_string(),
                error: ShaderLoadError::Empty,
            });
            continue;
        }
        let program = match session.compile(&source) {
            Ok(program) => program,
            Err(e) => {
                failures.push(ShaderFailure::Compile(e));
                continue;
            }
        };
        if let Err(e) = registry.insert(program) {
            failures.push(ShaderFailure::Registry(e));
        }
    }

    if failures.is_empty() {
        log::info!("imported {} shader(s)", registry.len());
        Ok(registry)
    } else {
        for f in &failures {
            log::warn!("shader import failed: {f}");
        }
        Err(ImportError { failures })
    }
}
