//! The mutable colony state.

use cgmath::{InnerSpace, Vector3};

use crate::cell::{Cell, CellFlags, CellSeed};
use crate::error::StateError;
use crate::id::StepId;
use crate::params::{Parameters, StepMeta};

/// Cell buffer, colony bookkeeping, and step counter.
///
/// The buffer length is the capacity and never changes after
/// construction. Live cells occupy slots `0..meta.cell_count` and carry
/// [`CellFlags::ALIVE`]; every slot past the live prefix is all-zero.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationState {
    cells: Vec<Cell>,
    meta: StepMeta,
    step: StepId,
}

impl SimulationState {
    /// Allocate an empty state holding up to `capacity` cells.
    pub fn with_capacity(capacity: usize) -> Result<Self, StateError> {
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(capacity)
            .map_err(|_| StateError::Allocation { capacity })?;
        cells.resize(capacity, Cell::default());
        Ok(Self {
            cells,
            meta: StepMeta::default(),
            step: StepId(0),
        })
    }

    /// Rebuild a state from its persisted parts.
    ///
    /// `live` holds exactly the live prefix. Fails when the parts violate
    /// any state invariant.
    pub fn from_parts(
        capacity: usize,
        live: &[Cell],
        meta: StepMeta,
        step: StepId,
    ) -> Result<Self, StateError> {
        if live.len() != meta.cell_count as usize {
            return Err(StateError::Invariant {
                slot: live.len(),
                reason: "live cell list does not match cell count",
            });
        }
        if live.len() > capacity {
            return Err(StateError::CapacityExceeded {
                capacity,
                requested: live.len(),
            });
        }
        let mut state = Self::with_capacity(capacity)?;
        state.cells[..live.len()].copy_from_slice(live);
        state.meta = meta;
        state.step = step;
        state.validate()?;
        Ok(state)
    }

    /// Check the live-prefix invariant and id bookkeeping.
    pub fn validate(&self) -> Result<(), StateError> {
        let count = self.meta.cell_count as usize;
        if count > self.cells.len() {
            return Err(StateError::CapacityExceeded {
                capacity: self.cells.len(),
                requested: count,
            });
        }
        for (slot, cell) in self.cells.iter().enumerate() {
            if slot < count {
                if !cell.is_alive() {
                    return Err(StateError::Invariant {
                        slot,
                        reason: "live slot without ALIVE flag",
                    });
                }
                if cell.id >= self.meta.next_cell_id {
                    return Err(StateError::Invariant {
                        slot,
                        reason: "cell id not below next_cell_id",
                    });
                }
            } else if cell.to_words() != [0; 16] {
                return Err(StateError::Invariant {
                    slot,
                    reason: "slot past the live prefix is not zeroed",
                });
            }
        }
        Ok(())
    }

    /// Number of cell slots.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Number of live cells.
    pub fn cell_count(&self) -> usize {
        self.meta.cell_count as usize
    }

    /// The live prefix of the cell buffer.
    pub fn live_cells(&self) -> &[Cell] {
        &self.cells[..self.cell_count()]
    }

    /// The whole cell buffer, including dead slots.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Mutable access to the whole cell buffer for kernels.
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Colony bookkeeping.
    pub fn meta(&self) -> &StepMeta {
        &self.meta
    }

    /// Mutable colony bookkeeping for kernels.
    pub fn meta_mut(&mut self) -> &mut StepMeta {
        &mut self.meta
    }

    /// Cell buffer and bookkeeping borrowed together.
    pub fn buffers_mut(&mut self) -> (&mut [Cell], &mut StepMeta) {
        (&mut self.cells, &mut self.meta)
    }

    /// Steps completed so far.
    pub fn step(&self) -> StepId {
        self.step
    }

    /// Record one completed step.
    pub fn advance(&mut self) {
        self.step = self.step.next();
    }

    /// Overwrite this state with `other`, reusing the allocation.
    pub fn copy_from(&mut self, other: &Self) -> Result<(), StateError> {
        if other.cells.len() != self.cells.len() {
            return Err(StateError::ShapeMismatch {
                expected: self.cells.len(),
                found: other.cells.len(),
            });
        }
        self.cells.copy_from_slice(&other.cells);
        self.meta = other.meta;
        self.step = other.step;
        Ok(())
    }

    /// Place a new cell in the first free slot and return its id.
    ///
    /// `noise` in `[0, 1)` jitters the division length.
    pub fn spawn(
        &mut self,
        seed: &CellSeed,
        params: &Parameters,
        noise: f32,
    ) -> Result<u32, StateError> {
        let slot = self.cell_count();
        if slot >= self.cells.len() {
            return Err(StateError::CapacityExceeded {
                capacity: self.cells.len(),
                requested: slot + 1,
            });
        }
        let mut position = Vector3::from(seed.position);
        let mut direction = Vector3::from(seed.direction);
        if params.planar {
            position.z = 0.0;
            direction.z = 0.0;
        }
        let norm = direction.magnitude();
        if !(norm > 0.0 && norm.is_finite()) {
            return Err(StateError::Invariant {
                slot,
                reason: "cell direction has no usable length",
            });
        }
        let id = self.meta.next_cell_id;
        self.cells[slot] = Cell {
            position: position.into(),
            length: seed.length,
            direction: (direction / norm).into(),
            radius: seed.radius,
            velocity: [0.0; 3],
            growth_rate: seed.growth_rate.unwrap_or(params.growth_rate),
            target_length: params.division_length(noise),
            cell_type: seed.cell_type,
            id,
            flags: CellFlags::ALIVE,
        };
        self.meta.cell_count += 1;
        self.meta.next_cell_id += 1;
        Ok(id)
    }

    /// Slot of the first live cell with a non-finite component.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.live_cells().iter().position(|c| !c.is_finite())
    }

    /// Whether both states are identical word for word.
    pub fn same_bits(&self, other: &Self) -> bool {
        self.step == other.step
            && self.meta == other.meta
            && self.cells.len() == other.cells.len()
            && self
                .cells
                .iter()
                .zip(&other.cells)
                .all(|(a, b)| a.to_words() == b.to_words())
    }
}
