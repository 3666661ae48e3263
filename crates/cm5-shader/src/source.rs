//! Shader source text as handed over by a loader.

use cm5_core::ShaderId;

/// A logical path and the WGSL text loaded from it.
///
/// Lives only for the import call that compiles it; the compiled program
/// keeps its own copy of the text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSource {
    path: String,
    text: String,
}

impl ShaderSource {
    /// Pair a logical path with its source text.
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// The logical path the text was loaded from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw WGSL text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Program identifier derived from the path.
    pub fn id(&self) -> Option<ShaderId> {
        ShaderId::from_path(&self.path)
    }

    /// Whether the text contains nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
