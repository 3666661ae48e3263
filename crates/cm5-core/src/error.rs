//! Errors raised while building or validating a [`SimulationState`](crate::SimulationState).

use std::error::Error;
use std::fmt;

/// Errors from allocating, copying, or assembling simulation state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateError {
    /// The cell buffer could not be reserved.
    Allocation {
        /// Requested capacity in cells.
        capacity: usize,
    },
    /// Two states of different capacity were combined.
    ShapeMismatch {
        /// Capacity of the destination.
        expected: usize,
        /// Capacity of the source.
        found: usize,
    },
    /// More live cells were requested than the state can hold.
    CapacityExceeded {
        /// State capacity.
        capacity: usize,
        /// Requested live cells.
        requested: usize,
    },
    /// A buffer violates the live-prefix invariant.
    Invariant {
        /// Offending slot.
        slot: usize,
        /// What is wrong with it.
        reason: &'static str,
    },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation { capacity } => {
                write!(f, "failed to allocate state for {capacity} cells")
            }
            Self::ShapeMismatch { expected, found } => {
                write!(f, "state capacity mismatch: expected {expected}, found {found}")
            }
            Self::CapacityExceeded {
                capacity,
                requested,
            } => write!(f, "{requested} cells exceed capacity {capacity}"),
            Self::Invariant { slot, reason } => write!(f, "slot {slot}: {reason}"),
        }
    }
}

impl Error for StateError {}
