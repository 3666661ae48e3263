//! WGSL shader compilation for the cm5 colony simulator.
//!
//! The [`ShaderCompiler`] is a process-wide, reference-counted service.
//! [`ShaderCompiler::startup`] returns a [`CompilerSession`] whose
//! [`compile`](CompilerSession::compile) turns a [`ShaderSource`] into an
//! immutable [`CompiledProgram`]: WGSL is parsed and validated with naga,
//! the single `@compute` entry point is selected, and its resource
//! bindings are reflected. Programs live in a [`ProgramRegistry`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod compiler;
pub mod error;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod program;
pub mod registry;
pub mod source;

pub use compiler::{canonical_wgsl, CompilerConfig, CompilerSession, ShaderCompiler, Target};
pub use error::{CompileError, CompileErrorKind, CompilerInitError, RegistryError, SourceLocation};
#[cfg(feature = "gpu")]
pub use gpu::GpuContext;
pub use program::{BindingInfo, BindingKind, CompiledProgram};
pub use registry::ProgramRegistry;
pub use source::ShaderSource;
