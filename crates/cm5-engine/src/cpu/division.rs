//! Host implementation of `divide` (shaders/division.wgsl).
//!
//! Processes dividers in slot order, which yields the same buffer the
//! rank-based parallel kernel produces.

use cgmath::Vector3;
use cm5_core::{Cell, CellFlags};

use crate::executor::StepFrame;

pub(crate) fn divide(frame: &mut StepFrame<'_>) {
    let p = frame.params;
    let count = p.cell_count as usize;
    let room = p.capacity.saturating_sub(p.cell_count) as usize;
    let mut rank = 0usize;

    for i in 0..count {
        if !frame.cells[i].wants_division() {
            continue;
        }
        let my_rank = rank;
        rank += 1;
        if my_rank >= room {
            continue;
        }
        let slot = count + my_rank;
        let parent = frame.cells[i];
        let centre = Vector3::from(parent.position);
        let split_length = (0.5 * parent.length - parent.radius).max(0.0);
        let offset = Vector3::from(parent.direction) * (0.5 * split_length + parent.radius);

        frame.cells[slot] = Cell {
            position: (centre + offset).into(),
            length: split_length,
            velocity: [0.0; 3],
            target_length: p.target_length + p.target_spread * frame.noise[slot],
            id: p.next_cell_id + my_rank as u32,
            flags: CellFlags::ALIVE,
            ..parent
        };

        let cell = &mut frame.cells[i];
        cell.position = (centre - offset).into();
        cell.length = split_length;
        cell.target_length = p.target_length + p.target_spread * frame.noise[i];
    }

    let done = rank.min(room) as u32;
    frame.meta.cell_count = p.cell_count + done;
    frame.meta.next_cell_id = p.next_cell_id + done;
    frame.meta.divisions = done;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests::Fixture;

    #[test]
    fn daughters_tile_the_parent() {
        let mut fx = Fixture::new(4);
        fx.push(4.0, 0.5, 1.0, 3.5);
        fx.cells[0].flags |= CellFlags::DIVIDE;
        fx.cells[0].cell_type = 3;
        fx.noise = vec![0.0, 0.5, 0.0, 0.0];
        fx.run(divide);

        assert_eq!(fx.meta.cell_count, 2);
        assert_eq!(fx.meta.next_cell_id, 2);
        assert_eq!(fx.meta.divisions, 1);

        let (parent, daughter) = (fx.cells[0], fx.cells[1]);
        assert_eq!(parent.length, 1.5);
        assert_eq!(daughter.length, 1.5);
        assert_eq!(parent.position, [-1.25, 0.0, 0.0]);
        assert_eq!(daughter.position, [1.25, 0.0, 0.0]);
        // Outer cap tips coincide with the parent's.
        assert_eq!(parent.position[0] - 0.75 - 0.5, -2.5);
        assert_eq!(daughter.position[0] + 0.75 + 0.5, 2.5);
        assert_eq!(parent.id, 0);
        assert_eq!(daughter.id, 1);
        assert_eq!(daughter.cell_type, 3);
        assert_eq!(daughter.flags, CellFlags::ALIVE);
        assert_eq!(parent.target_length, 3.5);
        assert_eq!(daughter.target_length, 3.75);
    }

    #[test]
    fn slots_follow_divider_rank() {
        let mut fx = Fixture::new(6);
        for _ in 0..3 {
            fx.push(4.0, 0.5, 1.0, 3.5);
        }
        fx.cells[0].flags |= CellFlags::DIVIDE;
        fx.cells[2].flags |= CellFlags::DIVIDE;
        fx.run(divide);
        assert_eq!(fx.meta.cell_count, 5);
        assert_eq!(fx.cells[3].id, 3);
        assert_eq!(fx.cells[4].id, 4);
        assert_eq!(fx.cells[3].position[0], 1.25);
        assert_eq!(fx.cells[1].length, 4.0);
    }

    #[test]
    fn over_capacity_dividers_stay_whole() {
        let mut fx = Fixture::new(3);
        fx.push(4.0, 0.5, 1.0, 3.5);
        fx.push(4.0, 0.5, 1.0, 3.5);
        fx.cells[0].flags |= CellFlags::DIVIDE;
        fx.cells[1].flags |= CellFlags::DIVIDE;
        fx.run(divide);
        assert_eq!(fx.meta.cell_count, 3);
        assert_eq!(fx.meta.divisions, 1);
        assert_eq!(fx.cells[0].length, 1.5);
        assert_eq!(fx.cells[1].length, 4.0);
        assert!(fx.cells[1].wants_division());
    }

    #[test]
    fn short_parents_clamp_to_spheres() {
        let mut fx = Fixture::new(2);
        fx.push(0.5, 0.5, 1.0, 0.0);
        fx.cells[0].flags |= CellFlags::DIVIDE;
        fx.run(divide);
        assert_eq!(fx.cells[0].length, 0.0);
        assert_eq!(fx.cells[1].length, 0.0);
        assert_eq!(fx.cells[1].position, [0.5, 0.0, 0.0]);
    }

    proptest::proptest! {
        #[test]
        fn any_divider_pattern_keeps_bookkeeping(
            pattern in proptest::collection::vec(proptest::bool::ANY, 1..12),
            spare in 0usize..12,
        ) {
            let mut fx = Fixture::new(pattern.len() + spare);
            for &divides in &pattern {
                fx.push(4.0, 0.5, 1.0, 3.5);
                if divides {
                    let slot = fx.meta.cell_count as usize - 1;
                    fx.cells[slot].flags |= CellFlags::DIVIDE;
                }
            }
            let n = pattern.len();
            let wanted = pattern.iter().filter(|d| **d).count();
            fx.run(divide);

            let done = wanted.min(spare);
            proptest::prop_assert_eq!(fx.meta.divisions as usize, done);
            proptest::prop_assert_eq!(fx.meta.cell_count as usize, n + done);
            proptest::prop_assert_eq!(fx.meta.next_cell_id as usize, n + done);
            let mut ids: Vec<u32> = fx.cells[..n + done].iter().map(|c| c.id).collect();
            ids.sort_unstable();
            proptest::prop_assert_eq!(ids, (0..(n + done) as u32).collect::<Vec<_>>());
            proptest::prop_assert!(fx.cells[n + done..].iter().all(|c| c.to_words() == [0; 16]));
        }
    }
}
