//! Strongly-typed identifiers.

use std::borrow::Borrow;
use std::fmt;

/// Monotonically increasing step counter.
///
/// Incremented exactly once per successful simulation step. Only loading
/// a step file can move it backwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u64);

impl StepId {
    /// The step that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Logical identifier of a shader program.
///
/// Derived from the shader's source path: the file stem, so
/// `"shaders/growth.wgsl"` becomes `growth`. Registry lookups and stage
/// plans refer to programs by this name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(String);

impl ShaderId {
    /// Derive the identifier from a logical source path.
    ///
    /// Both `/` and `\` are treated as separators. Returns `None` when the
    /// path has no usable stem (empty, a bare directory, or only an
    /// extension such as `".wgsl"`).
    pub fn from_path(path: &str) -> Option<Self> {
        let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let stem = match file.rfind('.') {
            Some(dot) => &file[..dot],
            None => file,
        };
        if stem.is_empty() {
            None
        } else {
            Some(Self(stem.to_string()))
        }
    }

    /// Construct an identifier directly from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ShaderId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ShaderId {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_id_is_file_stem() {
        assert_eq!(
            ShaderId::from_path("shaders/growth.wgsl").unwrap().as_str(),
            "growth"
        );
        assert_eq!(ShaderId::from_path("contact").unwrap().as_str(), "contact");
        assert_eq!(
            ShaderId::from_path(r"C:\cm5\shaders\division.wgsl")
                .unwrap()
                .as_str(),
            "division"
        );
        assert_eq!(
            ShaderId::from_path("a/b.c/integrate.v2.wgsl")
                .unwrap()
                .as_str(),
            "integrate.v2"
        );
    }

    #[test]
    fn shader_id_rejects_empty_stems() {
        assert!(ShaderId::from_path("").is_none());
        assert!(ShaderId::from_path("shaders/").is_none());
        assert!(ShaderId::from_path("shaders/.wgsl").is_none());
    }

    #[test]
    fn step_id_next_increments() {
        assert_eq!(StepId(0).next(), StepId(1));
        assert_eq!(StepId(41).next().to_string(), "42");
    }
}
