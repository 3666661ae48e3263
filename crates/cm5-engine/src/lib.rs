//! Stepped simulation engine for the cm5 colony simulator.
//!
//! [`Simulator`] ties together shader import ([`import_shaders`]), a
//! kernel [`Executor`] (the host [`CpuExecutor`] or, with the `gpu`
//! feature, a wgpu-backed one), and a double-buffered
//! [`SimulationState`](cm5_core::SimulationState). Every step either
//! completes and becomes visible, or fails and changes nothing.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod cpu;
pub mod error;
pub mod executor;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod import;
pub mod loader;
pub mod metrics;
pub mod noise;
pub mod plan;
pub mod simulator;

pub use config::{validate_parameters, ConfigError, SimulatorOptions, MAX_CAPACITY};
pub use cpu::CpuExecutor;
pub use error::{InitError, StepExecutionError};
pub use executor::{BindError, ExecutionError, ExecutionReport, Executor, StepFrame};
#[cfg(feature = "gpu")]
pub use gpu::GpuExecutor;
pub use import::{import_shaders, ImportError, ShaderFailure, ShaderLoadError, REQUIRED_SHADERS};
pub use loader::{FsLoader, LoadError, ShaderLoader};
pub use metrics::StepMetrics;
pub use plan::{Stage, StageKind, StagePlan};
pub use simulator::Simulator;
