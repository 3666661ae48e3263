//! The capsule cell record shared by host kernels, WGSL shaders, and codecs.
//!
//! A cell is a spherocylinder: a line segment of `length` along the unit
//! `direction`, centred on `position`, swept by a sphere of `radius`. The
//! layout is `#[repr(C)]` and matches the `Cell` struct declared in every
//! WGSL kernel, so state buffers can be uploaded to and read back from
//! the GPU without conversion.

use bytemuck::{Pod, Zeroable};
use cgmath::Vector3;

/// Bit flags stored in [`Cell::flags`].
pub struct CellFlags;

impl CellFlags {
    /// The slot holds a live cell.
    pub const ALIVE: u32 = 1;
    /// The cell has reached its target length and should divide.
    pub const DIVIDE: u32 = 2;
}

/// One cell slot in the state buffer.
///
/// 64 bytes, 16 little-endian 32-bit words. Dead slots are all-zero.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Cell {
    /// Centre of the cell axis.
    pub position: [f32; 3],
    /// Length of the axis segment (excluding the two end caps).
    pub length: f32,
    /// Unit axis direction.
    pub direction: [f32; 3],
    /// Capsule radius.
    pub radius: f32,
    /// Displacement rate accumulated during the last step.
    pub velocity: [f32; 3],
    /// Exponential volume growth rate.
    pub growth_rate: f32,
    /// Axis length at which the cell divides.
    pub target_length: f32,
    /// User-defined cell type (palette index in viz output).
    pub cell_type: u32,
    /// Unique cell id, assigned sequentially.
    pub id: u32,
    /// [`CellFlags`] bits.
    pub flags: u32,
}

/// Size of one [`Cell`] in 32-bit words.
pub const CELL_WORDS: usize = 16;

impl Cell {
    /// Whether the slot holds a live cell.
    pub fn is_alive(&self) -> bool {
        self.flags & CellFlags::ALIVE != 0
    }

    /// Whether the cell is flagged for division.
    pub fn wants_division(&self) -> bool {
        self.flags & CellFlags::DIVIDE != 0
    }

    /// Capsule volume: cylinder plus two hemispherical caps.
    pub fn volume(&self) -> f32 {
        let r2 = self.radius * self.radius;
        std::f32::consts::PI * r2 * (self.length + 4.0 / 3.0 * self.radius)
    }

    /// The two end points of the axis segment (cap centres).
    pub fn endpoints(&self) -> ([f32; 3], [f32; 3]) {
        let centre = Vector3::from(self.position);
        let half = Vector3::from(self.direction) * (0.5 * self.length);
        ((centre - half).into(), (centre + half).into())
    }

    /// Whether every float component is finite.
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.direction.iter().all(|v| v.is_finite())
            && self.velocity.iter().all(|v| v.is_finite())
            && self.length.is_finite()
            && self.radius.is_finite()
            && self.growth_rate.is_finite()
            && self.target_length.is_finite()
    }

    /// The cell as 16 raw words, in declaration order.
    pub fn to_words(&self) -> [u32; CELL_WORDS] {
        [
            self.position[0].to_bits(),
            self.position[1].to_bits(),
            self.position[2].to_bits(),
            self.length.to_bits(),
            self.direction[0].to_bits(),
            self.direction[1].to_bits(),
            self.direction[2].to_bits(),
            self.radius.to_bits(),
            self.velocity[0].to_bits(),
            self.velocity[1].to_bits(),
            self.velocity[2].to_bits(),
            self.growth_rate.to_bits(),
            self.target_length.to_bits(),
            self.cell_type,
            self.id,
            self.flags,
        ]
    }

    /// Rebuild a cell from the words produced by [`Cell::to_words`].
    pub fn from_words(w: &[u32; CELL_WORDS]) -> Self {
        let f = f32::from_bits;
        Self {
            position: [f(w[0]), f(w[1]), f(w[2])],
            length: f(w[3]),
            direction: [f(w[4]), f(w[5]), f(w[6])],
            radius: f(w[7]),
            velocity: [f(w[8]), f(w[9]), f(w[10])],
            growth_rate: f(w[11]),
            target_length: f(w[12]),
            cell_type: w[13],
            id: w[14],
            flags: w[15],
        }
    }
}

/// Description of a cell placed at construction time.
#[derive(Clone, Debug, PartialEq)]
pub struct CellSeed {
    /// Centre position.
    pub position: [f32; 3],
    /// Axis direction; normalized on spawn.
    pub direction: [f32; 3],
    /// Initial axis length.
    pub length: f32,
    /// Capsule radius.
    pub radius: f32,
    /// Growth rate; `None` uses the run default.
    pub growth_rate: Option<f32>,
    /// Cell type.
    pub cell_type: u32,
}

impl Default for CellSeed {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            direction: [1.0, 0.0, 0.0],
            length: 2.0,
            radius: 0.5,
            growth_rate: None,
            cell_type: 0,
        }
    }
}

/// Per-cell contact response accumulated by the contact kernel.
///
/// Scratch data: recomputed every relaxation pass and never persisted.
/// Matches the 32-byte `Contact` struct in the WGSL kernels.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ContactAccum {
    /// Summed translation to apply to the cell centre.
    pub translation: [f32; 3],
    /// Number of overlapping neighbours (as a float, for the GPU layout).
    pub neighbours: f32,
    /// Summed small-angle change to apply to the axis direction.
    pub rotation: [f32; 3],
    /// Padding to a 16-byte multiple.
    pub _pad: f32,
}
