//! Host implementation of `integrate` (shaders/integrate.wgsl).

use cgmath::{InnerSpace, Vector3};
use cm5_core::CellFlags;

use crate::executor::StepFrame;

const NORM_EPS: f32 = 1e-12;

pub(crate) fn integrate(frame: &mut StepFrame<'_>) {
    let p = frame.params;
    let n = frame.meta.cell_count as usize;
    for (cell, response) in frame.cells.iter_mut().zip(frame.contacts.iter()).take(n) {
        let translation = Vector3::from(response.translation);
        let mut position = Vector3::from(cell.position) + translation;
        let mut direction = Vector3::from(cell.direction) + Vector3::from(response.rotation);
        if p.planar != 0 {
            position.z = 0.0;
            direction.z = 0.0;
        }
        let norm = direction.magnitude();
        if norm > NORM_EPS {
            cell.direction = (direction * (1.0 / norm)).into();
        }
        cell.position = position.into();
        cell.velocity = (Vector3::from(cell.velocity) + translation * (1.0 / p.dt)).into();
        cell.flags &= !CellFlags::DIVIDE;
    }
}
