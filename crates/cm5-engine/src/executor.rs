//! The kernel-execution seam between the simulator and a backend.

use std::error::Error;
use std::fmt;

use cm5_core::{Cell, ContactAccum, KernelParams, ShaderId, StepMeta};
use cm5_shader::ProgramRegistry;

use crate::plan::StagePlan;

// ── Errors ─────────────────────────────────────────────────────────

/// A program could not be linked into an executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindError {
    /// The program that failed to link.
    pub shader: ShaderId,
    /// Why it failed.
    pub reason: String,
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot bind shader '{}': {}", self.shader, self.reason)
    }
}

impl Error for BindError {}

/// An executor failed while running a stage plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionError {
    /// The backend reported an error.
    Failed {
        /// Program of the failing stage.
        stage: String,
        /// Backend-specific description.
        reason: String,
    },
    /// A stage produced a non-finite value in a live cell.
    NonFinite {
        /// Program of the stage that produced it.
        stage: String,
        /// Slot of the first affected cell.
        cell: usize,
    },
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { stage, reason } => write!(f, "stage '{stage}' failed: {reason}"),
            Self::NonFinite { stage, cell } => {
                write!(f, "stage '{stage}' produced a non-finite value in cell {cell}")
            }
        }
    }
}

impl Error for ExecutionError {}

// ── StepFrame ──────────────────────────────────────────────────────

/// Buffers one step runs against.
///
/// `cells` and `meta` belong to the back buffer of the simulator; the
/// executor may leave them in any state when it fails.
pub struct StepFrame<'a> {
    /// Uniform block for this step.
    pub params: KernelParams,
    /// The full cell buffer (capacity slots).
    pub cells: &'a mut [Cell],
    /// Colony bookkeeping.
    pub meta: &'a mut StepMeta,
    /// Contact scratch, one entry per slot.
    pub contacts: &'a mut [ContactAccum],
    /// Per-slot uniforms in `[0, 1)` for this step.
    pub noise: &'a [f32],
}

/// What an executor reports after a successful run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Per-stage time in microseconds, in plan order. Backends that
    /// cannot time stages individually report a single entry.
    pub stage_us: Vec<(String, u64)>,
    /// Kernel dispatches issued.
    pub dispatches: u32,
}

// ── Executor ───────────────────────────────────────────────────────

/// Runs compiled programs against step buffers.
///
/// `Send` so a [`Simulator`](crate::Simulator) can move between threads.
pub trait Executor: Send {
    /// Human-readable backend name for logging and errors.
    fn name(&self) -> &str;

    /// Link every program in `registry`. Called once during construction.
    ///
    /// Returns every program that could not be linked.
    fn bind(&mut self, registry: &ProgramRegistry) -> Result<(), Vec<BindError>>;

    /// Run `plan` once against `frame`.
    fn execute(
        &mut self,
        plan: &StagePlan,
        frame: StepFrame<'_>,
    ) -> Result<ExecutionReport, ExecutionError>;
}
