//! Viz-file codec: a presentation snapshot for external viewers.
//!
//! ```text
//! ["CM5V"] [version u8] [cell_count u32]
//! [min_x f32] [min_y f32] [min_z f32] [max_x f32] [max_y f32] [max_z f32]
//! per cell (36 bytes):
//!   [a: 3 x f32] [b: 3 x f32] [radius f32] [r u8] [g u8] [b u8] [flags u8] [id u32]
//! ```
//!
//! `a` and `b` are the cap centres. The only flag bit is
//! [`VIZ_FLAG_DIVIDING`]. The format drops growth and bookkeeping data and
//! cannot be turned back into a simulation state.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use cm5_core::SimulationState;

use crate::atomic::write_atomic;
use crate::codec::*;
use crate::error::CodecError;

/// Magic bytes at the start of every viz file.
pub const VIZ_MAGIC: [u8; 4] = *b"CM5V";

/// Current viz-file format version.
pub const VIZ_FORMAT_VERSION: u8 = 1;

/// Encoded size of one cell record.
pub const VIZ_CELL_BYTES: usize = 36;

/// Flag bit set on cells that were flagged for division.
pub const VIZ_FLAG_DIVIDING: u8 = 1;

/// Colour used for cell types outside the palette.
pub const UNKNOWN_TYPE_COLOR: [u8; 3] = [128, 128, 128];

/// One cell as drawn by a viewer.
#[derive(Clone, Debug, PartialEq)]
pub struct VizCell {
    /// First cap centre.
    pub a: [f32; 3],
    /// Second cap centre.
    pub b: [f32; 3],
    /// Capsule radius.
    pub radius: f32,
    /// RGB colour.
    pub color: [u8; 3],
    /// Whether the cell was flagged for division.
    pub dividing: bool,
    /// Cell id.
    pub id: u32,
}

/// A presentation view of the colony.
#[derive(Clone, Debug, PartialEq)]
pub struct VizFrame {
    /// Lower corner of the colony bounding box, caps included.
    pub bounds_min: [f32; 3],
    /// Upper corner of the colony bounding box, caps included.
    pub bounds_max: [f32; 3],
    /// Live cells in slot order.
    pub cells: Vec<VizCell>,
}

impl VizFrame {
    /// Derive the view of `state`, colouring cells by type from `palette`.
    ///
    /// An empty colony has an all-zero bounding box.
    pub fn from_state(state: &SimulationState, palette: &[[f32; 3]]) -> Self {
        let mut bounds_min = [f32::INFINITY; 3];
        let mut bounds_max = [f32::NEG_INFINITY; 3];
        let cells: Vec<VizCell> = state
            .live_cells()
            .iter()
            .map(|cell| {
                let (a, b) = cell.endpoints();
                for k in 0..3 {
                    bounds_min[k] = bounds_min[k].min(a[k] - cell.radius).min(b[k] - cell.radius);
                    bounds_max[k] = bounds_max[k].max(a[k] + cell.radius).max(b[k] + cell.radius);
                }
                VizCell {
                    a,
                    b,
                    radius: cell.radius,
                    color: palette
                        .get(cell.cell_type as usize)
                        .map(|rgb| rgb.map(channel))
                        .unwrap_or(UNKNOWN_TYPE_COLOR),
                    dividing: cell.wants_division(),
                    id: cell.id,
                }
            })
            .collect();
        if cells.is_empty() {
            bounds_min = [0.0; 3];
            bounds_max = [0.0; 3];
        }
        Self {
            bounds_min,
            bounds_max,
            cells,
        }
    }
}

fn channel(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Encode a frame.
pub fn encode_viz(w: &mut dyn Write, frame: &VizFrame) -> Result<(), CodecError> {
    w.write_all(&VIZ_MAGIC)?;
    write_u8(w, VIZ_FORMAT_VERSION)?;
    write_count(w, frame.cells.len(), "cell count")?;
    for v in frame.bounds_min.iter().chain(&frame.bounds_max) {
        write_f32_le(w, *v)?;
    }
    for cell in &frame.cells {
        for v in cell.a.iter().chain(&cell.b) {
            write_f32_le(w, *v)?;
        }
        write_f32_le(w, cell.radius)?;
        let flags = if cell.dividing { VIZ_FLAG_DIVIDING } else { 0 };
        w.write_all(&[cell.color[0], cell.color[1], cell.color[2], flags])?;
        write_u32_le(w, cell.id)?;
    }
    Ok(())
}

/// Decode a frame. For inspection and tests; viewers read the bytes directly.
pub fn decode_viz(r: &mut dyn Read) -> Result<VizFrame, CodecError> {
    read_header(r, VIZ_MAGIC, VIZ_FORMAT_VERSION)?;
    let count = read_u32_le(r)?;
    let mut bounds = [0f32; 6];
    for v in &mut bounds {
        *v = read_f32_le(r)?;
    }
    let mut cells = Vec::new();
    for _ in 0..count {
        let mut ends = [0f32; 6];
        for v in &mut ends {
            *v = read_f32_le(r)?;
        }
        let radius = read_f32_le(r)?;
        let mut rgbf = [0u8; 4];
        r.read_exact(&mut rgbf)?;
        if rgbf[3] & !VIZ_FLAG_DIVIDING != 0 {
            return Err(CodecError::malformed(format!("unknown cell flags {:#04x}", rgbf[3])));
        }
        cells.push(VizCell {
            a: [ends[0], ends[1], ends[2]],
            b: [ends[3], ends[4], ends[5]],
            radius,
            color: [rgbf[0], rgbf[1], rgbf[2]],
            dividing: rgbf[3] & VIZ_FLAG_DIVIDING != 0,
            id: read_u32_le(r)?,
        });
    }
    Ok(VizFrame {
        bounds_min: [bounds[0], bounds[1], bounds[2]],
        bounds_max: [bounds[3], bounds[4], bounds[5]],
        cells,
    })
}

/// Atomically write a viz file for `state` to `path`.
pub fn write_viz_file(
    path: &Path,
    state: &SimulationState,
    palette: &[[f32; 3]],
) -> Result<(), CodecError> {
    let frame = VizFrame::from_state(state, palette);
    write_atomic(path, |w| encode_viz(w, &frame))?;
    log::debug!(
        "wrote viz file {} ({} cells)",
        path.display(),
        frame.cells.len()
    );
    Ok(())
}

/// Read a viz file back.
pub fn read_viz_file(path: &Path) -> Result<VizFrame, CodecError> {
    let mut r = BufReader::new(File::open(path)?);
    decode_viz(&mut r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cm5_core::{CellFlags, CellSeed, Parameters};

    fn colony() -> SimulationState {
        let params = Parameters::default();
        let mut state = SimulationState::with_capacity(4).unwrap();
        state.spawn(&CellSeed::default(), &params, 0.0).unwrap();
        state
            .spawn(
                &CellSeed {
                    position: [0.0, 3.0, 0.0],
                    direction: [0.0, 1.0, 0.0],
                    cell_type: 7,
                    ..CellSeed::default()
                },
                &params,
                0.0,
            )
            .unwrap();
        state.cells_mut()[0].flags |= CellFlags::DIVIDE;
        state
    }

    #[test]
    fn frame_derives_geometry_and_colour() {
        let palette = [[1.0, 0.0, 0.5]];
        let frame = VizFrame::from_state(&colony(), &palette);
        assert_eq!(frame.cells.len(), 2);
        let first = &frame.cells[0];
        assert_eq!(first.a, [-1.0, 0.0, 0.0]);
        assert_eq!(first.b, [1.0, 0.0, 0.0]);
        assert_eq!(first.color, [255, 0, 128]);
        assert!(first.dividing);
        assert_eq!(frame.cells[1].color, UNKNOWN_TYPE_COLOR);
        assert!(!frame.cells[1].dividing);
        assert_eq!(frame.bounds_min, [-1.5, -0.5, -0.5]);
        assert_eq!(frame.bounds_max, [1.5, 4.5, 0.5]);
    }

    #[test]
    fn encode_decode_and_size() {
        let frame = VizFrame::from_state(&colony(), &[]);
        let mut buf = Vec::new();
        encode_viz(&mut buf, &frame).unwrap();
        assert_eq!(buf.len(), 5 + 4 + 24 + 2 * VIZ_CELL_BYTES);
        assert_eq!(decode_viz(&mut buf.as_slice()).unwrap(), frame);
    }

    #[test]
    fn empty_colony_has_zero_bounds() {
        let state = SimulationState::with_capacity(2).unwrap();
        let frame = VizFrame::from_state(&state, &[]);
        assert!(frame.cells.is_empty());
        assert_eq!(frame.bounds_min, [0.0; 3]);
        assert_eq!(frame.bounds_max, [0.0; 3]);
    }
}
