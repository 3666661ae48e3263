//! Compiled programs and their reflected resource interface.

use std::fmt;

use cm5_core::ShaderId;
use smallvec::SmallVec;

use crate::compiler::CompilerSession;

/// How a kernel accesses a bound resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// `var<uniform>`.
    Uniform,
    /// `var<storage, read>`.
    StorageRead,
    /// `var<storage, read_write>`.
    StorageReadWrite,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform => write!(f, "uniform"),
            Self::StorageRead => write!(f, "storage(read)"),
            Self::StorageReadWrite => write!(f, "storage(read_write)"),
        }
    }
}

/// One resource binding used by a program's entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingInfo {
    /// `@group` index.
    pub group: u32,
    /// `@binding` index.
    pub binding: u32,
    /// Variable name in the source.
    pub name: String,
    /// Access mode.
    pub kind: BindingKind,
    /// Element stride in bytes when the resource is an array.
    pub stride: Option<u32>,
}

/// Bindings of a typical kernel fit inline.
pub type Bindings = SmallVec<[BindingInfo; 6]>;

/// An immutable, validated shader program.
///
/// Owned by the [`ProgramRegistry`](crate::ProgramRegistry). Holds a
/// handle on the compiler session that produced it, which keeps the
/// compiler running for as long as the program exists.
pub struct CompiledProgram {
    id: ShaderId,
    path: String,
    source: String,
    canonical: String,
    module: naga::Module,
    entry_point: String,
    workgroup_size: [u32; 3],
    bindings: Bindings,
    session: CompilerSession,
}

impl CompiledProgram {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: ShaderId,
        path: String,
        source: String,
        canonical: String,
        module: naga::Module,
        entry_point: String,
        workgroup_size: [u32; 3],
        bindings: Bindings,
        session: CompilerSession,
    ) -> Self {
        Self {
            id,
            path,
            source,
            canonical,
            module,
            entry_point,
            workgroup_size,
            bindings,
            session,
        }
    }

    /// Program identifier.
    pub fn id(&self) -> &ShaderId {
        &self.id
    }

    /// Logical path the program was loaded from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// WGSL source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The program as re-emitted from its IR by naga's WGSL writer.
    ///
    /// Two sources that differ only in comments or layout share one
    /// canonical source. See [`canonical_wgsl`](crate::canonical_wgsl).
    pub fn canonical_source(&self) -> &str {
        &self.canonical
    }

    /// The validated naga IR.
    pub fn module(&self) -> &naga::Module {
        &self.module
    }

    /// Name of the single `@compute` entry point.
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// `@workgroup_size` of the entry point.
    pub fn workgroup_size(&self) -> [u32; 3] {
        self.workgroup_size
    }

    /// Invocations per workgroup.
    pub fn invocations_per_workgroup(&self) -> u32 {
        self.workgroup_size.iter().product()
    }

    /// Resource bindings used by the entry point, sorted by group then binding.
    pub fn bindings(&self) -> &[BindingInfo] {
        &self.bindings
    }

    /// Look up a binding by group and index.
    pub fn binding(&self, group: u32, binding: u32) -> Option<&BindingInfo> {
        self.bindings
            .iter()
            .find(|b| b.group == group && b.binding == binding)
    }

    /// The session that compiled this program.
    pub fn session(&self) -> &CompilerSession {
        &self.session
    }
}

impl fmt::Debug for CompiledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("entry_point", &self.entry_point)
            .field("workgroup_size", &self.workgroup_size)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

/// Collect the resource bindings the entry point at `ep_index` uses.
///
/// Globals declared but never touched by the entry point are skipped, so
/// the result matches what a pipeline with an automatic layout expects.
pub(crate) fn reflect_bindings(
    module: &naga::Module,
    info: &naga::valid::ModuleInfo,
    ep_index: usize,
) -> Bindings {
    let usage = info.get_entry_point(ep_index);
    let mut out = Bindings::new();
    for (handle, var) in module.global_variables.iter() {
        let Some(res) = &var.binding else {
            continue;
        };
        if usage[handle].is_empty() {
            continue;
        }
        let kind = match var.space {
            naga::AddressSpace::Uniform => BindingKind::Uniform,
            naga::AddressSpace::Storage { access } => {
                if access.contains(naga::StorageAccess::STORE) {
                    BindingKind::StorageReadWrite
                } else {
                    BindingKind::StorageRead
                }
            }
            _ => continue,
        };
        let stride = match module.types[var.ty].inner {
            naga::TypeInner::Array { stride, .. } => Some(stride),
            _ => None,
        };
        out.push(BindingInfo {
            group: res.group,
            binding: res.binding,
            name: var.name.clone().unwrap_or_default(),
            kind,
            stride,
        });
    }
    out.sort_by_key(|b| (b.group, b.binding));
    out
}
