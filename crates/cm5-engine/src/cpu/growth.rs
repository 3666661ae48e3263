//! Host implementation of `grow` (shaders/growth.wgsl).

use cm5_core::CellFlags;

use crate::executor::StepFrame;

pub(crate) fn grow(frame: &mut StepFrame<'_>) {
    let p = frame.params;
    for cell in frame.cells.iter_mut().take(p.cell_count as usize) {
        cell.velocity = [0.0; 3];
        cell.length += p.dt * cell.growth_rate * (cell.length + 4.0 / 3.0 * cell.radius);
        if cell.length >= cell.target_length {
            cell.flags |= CellFlags::DIVIDE;
        } else {
            cell.flags &= !CellFlags::DIVIDE;
        }
    }
}
