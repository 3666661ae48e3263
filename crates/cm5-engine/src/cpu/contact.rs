//! Host implementation of `contact` (shaders/contact.wgsl).

use cgmath::{InnerSpace, Vector3};
use cm5_core::ContactAccum;

use super::Vec3;
use crate::executor::StepFrame;

const SEGMENT_EPS: f32 = 1e-8;
const CONTACT_EPS: f32 = 1e-6;

/// Parameters `(s, t)` of the closest points on segments `p1 + s*d1`
/// and `p2 + t*d2`, both clamped to `[0, 1]`.
pub(crate) fn closest_params(p1: Vec3, d1: Vec3, p2: Vec3, d2: Vec3) -> (f32, f32) {
    let r = p1 - p2;
    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);
    if a <= SEGMENT_EPS && e <= SEGMENT_EPS {
        return (0.0, 0.0);
    }
    if a <= SEGMENT_EPS {
        return (0.0, (f / e).clamp(0.0, 1.0));
    }
    let c = d1.dot(r);
    if e <= SEGMENT_EPS {
        return ((-c / a).clamp(0.0, 1.0), 0.0);
    }
    let b = d1.dot(d2);
    let denom = a * e - b * b;
    let mut s = 0.0;
    if denom > SEGMENT_EPS {
        s = ((b * f - c * e) / denom).clamp(0.0, 1.0);
    }
    let mut t = (b * s + f) / e;
    if t < 0.0 {
        t = 0.0;
        s = (-c / a).clamp(0.0, 1.0);
    } else if t > 1.0 {
        t = 1.0;
        s = ((b - c) / a).clamp(0.0, 1.0);
    }
    (s, t)
}

pub(crate) fn contact(frame: &mut StepFrame<'_>) {
    let stiffness = frame.params.stiffness;
    let n = frame.meta.cell_count as usize;
    let cells = &*frame.cells;

    for i in 0..n {
        let cell = cells[i];
        let position = Vector3::from(cell.position);
        let direction = Vector3::from(cell.direction);
        let half_i = 0.5 * cell.length;
        let start_i = position - direction * half_i;
        let axis_i = direction * cell.length;
        let arm = half_i + cell.radius;

        let mut translation = Vector3::new(0.0f32, 0.0, 0.0);
        let mut rotation = Vector3::new(0.0f32, 0.0, 0.0);
        let mut neighbours = 0.0f32;

        for (j, other) in cells.iter().enumerate().take(n) {
            if j == i {
                continue;
            }
            let other_position = Vector3::from(other.position);
            let other_direction = Vector3::from(other.direction);
            let half_j = 0.5 * other.length;
            let reach = half_i + half_j + cell.radius + other.radius;
            if (position - other_position).magnitude2() > reach * reach {
                continue;
            }
            let start_j = other_position - other_direction * half_j;
            let axis_j = other_direction * other.length;
            let (s, t) = closest_params(start_i, axis_i, start_j, axis_j);
            let delta = (start_i + axis_i * s) - (start_j + axis_j * t);
            let dist = delta.magnitude();
            let overlap = cell.radius + other.radius - dist;
            if overlap <= 0.0 {
                continue;
            }
            let normal = if dist > CONTACT_EPS {
                delta * (1.0 / dist)
            } else if i < j {
                Vector3::new(-1.0, 0.0, 0.0)
            } else {
                Vector3::new(1.0, 0.0, 0.0)
            };
            let push = normal * (overlap * 0.5 * stiffness);
            translation += push;
            let lever = (s - 0.5) * cell.length;
            let perp = push - direction * push.dot(direction);
            rotation += perp * (lever / (arm * arm));
            neighbours += 1.0;
        }

        frame.contacts[i] = ContactAccum {
            translation: translation.into(),
            neighbours,
            rotation: rotation.into(),
            _pad: 0.0,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests::Fixture;
    use cgmath::vec3;

    #[test]
    fn closest_points_of_crossing_segments() {
        let (s, t) = closest_params(
            vec3(-1.0, 0.0, 0.0),
            vec3(2.0, 0.0, 0.0),
            vec3(0.0, -1.0, 1.0),
            vec3(0.0, 2.0, 0.0),
        );
        assert!((s - 0.5).abs() < 1e-6);
        assert!((t - 0.5).abs() < 1e-6);
    }

    #[test]
    fn closest_points_clamp_to_ends() {
        let (s, t) = closest_params(
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 0.0, 0.0),
            vec3(3.0, 0.0, 0.0),
            vec3(1.0, 0.0, 0.0),
        );
        assert_eq!((s, t), (1.0, 0.0));
    }

    #[test]
    fn overlapping_neighbours_push_apart() {
        let mut fx = Fixture::new(3);
        fx.push(2.0, 0.5, 1.0, 3.5);
        fx.push(2.0, 0.5, 1.0, 3.5);
        fx.cells[1].position = [0.0, 0.8, 0.0];
        fx.run(contact);

        // Parallel rods 0.8 apart with radius 0.5 overlap by 0.2.
        let expected = 0.2 * 0.5 * 0.5;
        let a = fx.contacts[0];
        let b = fx.contacts[1];
        assert!((a.translation[1] + expected).abs() < 1e-6);
        assert!((b.translation[1] - expected).abs() < 1e-6);
        assert_eq!(a.neighbours, 1.0);
        assert_eq!(fx.contacts[2], ContactAccum::default());
    }

    #[test]
    fn separated_cells_do_not_interact() {
        let mut fx = Fixture::new(2);
        fx.push(2.0, 0.5, 1.0, 3.5);
        fx.push(2.0, 0.5, 1.0, 3.5);
        fx.cells[1].position = [0.0, 1.01, 0.0];
        fx.contacts[0].translation = [9.0; 3];
        fx.run(contact);
        assert_eq!(fx.contacts[0], ContactAccum::default());
    }

    #[test]
    fn coincident_cells_split_along_x() {
        let mut fx = Fixture::new(2);
        fx.push(0.0, 0.5, 1.0, 3.5);
        fx.push(0.0, 0.5, 1.0, 3.5);
        fx.run(contact);
        assert!(fx.contacts[0].translation[0] < 0.0);
        assert!(fx.contacts[1].translation[0] > 0.0);
        assert_eq!(
            fx.contacts[0].translation[0],
            -fx.contacts[1].translation[0]
        );
    }

    #[test]
    fn off_centre_contact_turns_the_cell() {
        let mut fx = Fixture::new(2);
        fx.push(4.0, 0.5, 1.0, 5.0);
        fx.push(0.0, 0.5, 1.0, 5.0);
        // A sphere resting against the +x end from above.
        fx.cells[1].position = [1.5, 0.9, 0.0];
        fx.run(contact);
        let r = fx.contacts[0].rotation;
        assert!(r[1] < 0.0);
        assert_eq!(r[0], 0.0);
    }
}
