//! Insertion-ordered table of compiled programs.

use cm5_core::ShaderId;
use indexmap::IndexMap;

use crate::error::RegistryError;
use crate::program::CompiledProgram;

/// Compiled programs keyed by [`ShaderId`].
///
/// Populated once during import and read-only afterwards. Iteration
/// follows insertion order.
#[derive(Debug, Default)]
pub struct ProgramRegistry {
    programs: IndexMap<ShaderId, CompiledProgram>,
}

impl ProgramRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a program. Rejects an id that is already present.
    pub fn insert(&mut self, program: CompiledProgram) -> Result<(), RegistryError> {
        if self.programs.contains_key(program.id()) {
            return Err(RegistryError::Duplicate {
                id: program.id().clone(),
                path: program.path().to_string(),
            });
        }
        self.programs.insert(program.id().clone(), program);
        Ok(())
    }

    /// Look up a program by id.
    pub fn get(&self, id: &str) -> Option<&CompiledProgram> {
        self.programs.get(id)
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.programs.contains_key(id)
    }

    /// Number of programs.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether the registry holds no programs.
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Registered ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &ShaderId> {
        self.programs.keys()
    }

    /// Programs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CompiledProgram> {
        self.programs.values()
    }
}
