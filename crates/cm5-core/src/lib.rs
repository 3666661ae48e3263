//! Core types for the cm5 colony simulator.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! GPU-shareable cell record, the per-step metadata and kernel uniforms,
//! the persisted run parameters, and the fixed-shape [`SimulationState`]
//! that every other crate reads or advances.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod cell;
pub mod error;
pub mod id;
pub mod params;
pub mod state;

pub use cell::{Cell, CellFlags, CellSeed, ContactAccum};
pub use error::StateError;
pub use id::{ShaderId, StepId};
pub use params::{KernelParams, Parameters, StepMeta};
pub use state::SimulationState;
