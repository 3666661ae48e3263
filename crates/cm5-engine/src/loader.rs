//! The source-loading capability supplied by the host.

use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

/// A loader failed to produce source text for a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadError {
    /// The logical path that was requested.
    pub path: String,
    /// The loader's description of the failure.
    pub reason: String,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot load '{}': {}", self.path, self.reason)
    }
}

impl Error for LoadError {}

/// Maps a logical shader path to its source text.
///
/// Called exactly once per required shader during construction. Any
/// `FnMut(&str) -> Result<String, E>` with a displayable error is a
/// loader, so hosts can pass a closure.
pub trait ShaderLoader {
    /// Load the source text for `path`.
    fn load(&mut self, path: &str) -> Result<String, LoadError>;
}

impl<F, E> ShaderLoader for F
where
    F: FnMut(&str) -> Result<String, E>,
    E: fmt::Display,
{
    fn load(&mut self, path: &str) -> Result<String, LoadError> {
        self(path).map_err(|e| LoadError {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Loads shaders from files under a root directory.
#[derive(Clone, Debug)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    /// Resolve logical paths relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ShaderLoader for FsLoader {
    fn load(&mut self, path: &str) -> Result<String, LoadError> {
        let full = self.root.join(path);
        std::fs::read_to_string(&full).map_err(|e| LoadError {
            path: path.to_string(),
            reason: format!("{}: {e}", full.display()),
        })
    }
}
