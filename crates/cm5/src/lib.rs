//! cm5: a stepped, shader-driven simulator for rod-shaped bacterial colonies.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the cm5 sub-crates.
//!
//! # Quick start
//!
//! ```no_run
//! use cm5::prelude::*;
//!
//! let mut loader = FsLoader::new(".");
//! let mut sim = Simulator::new(SimulatorOptions::default(), &mut loader)?;
//! for _ in 0..100 {
//!     sim.step()?;
//! }
//! sim.write_step_file("colony.cm5s")?;
//! sim.write_viz_file("colony.cm5v")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cm5-core` | Cell record, parameters, ids, simulation state |
//! | [`shader`] | `cm5-shader` | WGSL compiler sessions, programs, registry |
//! | [`io`] | `cm5-io` | Step-file and viz-file codecs |
//! | [`engine`] | `cm5-engine` | Simulator, executors, shader import |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`cm5-core`).
pub use cm5_core as types;

/// WGSL compilation and the program registry (`cm5-shader`).
pub use cm5_shader as shader;

/// Step-file and viz-file codecs (`cm5-io`).
pub use cm5_io as io;

/// The simulator and its executors (`cm5-engine`).
pub use cm5_engine as engine;

/// Common imports for typical cm5 usage.
///
/// ```rust
/// use cm5::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use cm5_core::{Cell, CellFlags, CellSeed, Parameters, SimulationState, StepId};

    // Shaders
    pub use cm5_shader::{CompileError, ShaderCompiler, Target};

    // Files
    pub use cm5_io::{read_step_file, read_viz_file, CodecError, StepFile, VizFrame};

    // Engine
    pub use cm5_engine::{
        FsLoader, ImportError, InitError, ShaderLoader, Simulator, SimulatorOptions,
        StepExecutionError, StepMetrics,
    };
}
