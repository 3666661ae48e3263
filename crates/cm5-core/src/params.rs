//! Run parameters and the per-step records shared with kernels.

use bytemuck::{Pod, Zeroable};

use crate::cell::Cell;

// ── StepMeta ───────────────────────────────────────────────────────

/// Colony bookkeeping written by the division kernel.
///
/// 16 bytes; matches the `Meta` struct in the WGSL kernels.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct StepMeta {
    /// Number of live cells. Live cells occupy slots `0..cell_count`.
    pub cell_count: u32,
    /// Id the next daughter cell will receive.
    pub next_cell_id: u32,
    /// Divisions performed during the last step.
    pub divisions: u32,
    /// Padding to 16 bytes.
    pub _pad: u32,
}

// ── KernelParams ───────────────────────────────────────────────────

/// Uniform block bound at `@group(0) @binding(0)` in every kernel.
///
/// `cell_count` and `next_cell_id` are the values at the start of the
/// step. Kernels read loop bounds from here rather than from the
/// mutable [`StepMeta`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct KernelParams {
    /// Step length.
    pub dt: f32,
    /// Fraction of each pairwise overlap resolved per relaxation pass.
    pub stiffness: f32,
    /// Mean division length.
    pub target_length: f32,
    /// Spread of the uniform jitter added to `target_length`.
    pub target_spread: f32,
    /// Live cells at the start of the step.
    pub cell_count: u32,
    /// State buffer capacity in cells.
    pub capacity: u32,
    /// `next_cell_id` at the start of the step.
    pub next_cell_id: u32,
    /// Non-zero confines the colony to the `z = 0` plane.
    pub planar: u32,
    /// Padding to a 16-byte multiple.
    pub _pad: [u32; 4],
}

impl KernelParams {
    /// Assemble the uniform block for a step starting from `meta`.
    pub fn for_step(params: &Parameters, meta: &StepMeta, capacity: u32) -> Self {
        Self {
            dt: params.dt as f32,
            stiffness: params.stiffness,
            target_length: params.target_length,
            target_spread: params.target_spread,
            cell_count: meta.cell_count,
            capacity,
            next_cell_id: meta.next_cell_id,
            planar: u32::from(params.planar),
            _pad: [0; 4],
        }
    }
}

// ── Parameters ─────────────────────────────────────────────────────

/// Persisted run parameters.
///
/// Everything needed, together with the cell buffer and step counter,
/// to resume a run exactly. Stored verbatim in the step file.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameters {
    /// Step length. Default: 0.05.
    pub dt: f64,
    /// Contact/integrate relaxation passes per step. Default: 4.
    pub contact_iterations: u32,
    /// Overlap fraction resolved per pass, in `(0, 1]`. Default: 0.5.
    pub stiffness: f32,
    /// Confine the colony to the `z = 0` plane. Default: true.
    pub planar: bool,
    /// Mean division length. Default: 3.5.
    pub target_length: f32,
    /// Jitter added to the division length, uniform in `[0, spread)`.
    /// Default: 0.5.
    pub target_spread: f32,
    /// Noise seed. Default: 0.
    pub seed: u64,
    /// Growth rate given to cells spawned without one. Default: 1.0.
    pub growth_rate: f32,
    /// RGB colour per cell type, used only by viz output.
    pub palette: Vec<[f32; 3]>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            dt: 0.05,
            contact_iterations: 4,
            stiffness: 0.5,
            planar: true,
            target_length: 3.5,
            target_spread: 0.5,
            seed: 0,
            growth_rate: 1.0,
            palette: vec![[0.2, 0.7, 0.3], [0.9, 0.4, 0.1], [0.2, 0.4, 0.9]],
        }
    }
}

impl Parameters {
    /// Division length for a cell given a noise sample in `[0, 1)`.
    pub fn division_length(&self, noise: f32) -> f32 {
        self.target_length + self.target_spread * noise
    }
}

/// Bytes occupied by `capacity` cells on the device.
pub const fn cell_buffer_size(capacity: u32) -> u64 {
    capacity as u64 * std::mem::size_of::<Cell>() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layouts_are_sixteen_byte_multiples() {
        assert_eq!(std::mem::size_of::<StepMeta>(), 16);
        assert_eq!(std::mem::size_of::<KernelParams>(), 48);
    }

    #[test]
    fn kernel_params_snapshot_pre_step_meta() {
        let params = Parameters {
            planar: false,
            ..Parameters::default()
        };
        let meta = StepMeta {
            cell_count: 5,
            next_cell_id: 9,
            divisions: 2,
            _pad: 0,
        };
        let k = KernelParams::for_step(&params, &meta, 64);
        assert_eq!(k.cell_count, 5);
        assert_eq!(k.next_cell_id, 9);
        assert_eq!(k.capacity, 64);
        assert_eq!(k.planar, 0);
        assert_eq!(k.dt, 0.05f32);
    }

    #[test]
    fn division_length_spans_spread() {
        let p = Parameters::default();
        assert_eq!(p.division_length(0.0), 3.5);
        assert!(p.division_length(0.999) < 4.0);
        assert_eq!(cell_buffer_size(4), 256);
    }
}
