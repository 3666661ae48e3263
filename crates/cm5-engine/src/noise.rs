//! Per-step noise: the uniforms division draws fresh target lengths from.
//!
//! Every step's samples come from a generator seeded with
//! `seed ^ step`, so a run resumed from a step file reproduces the
//! noise of the original run from the seed and step counter alone.

use cm5_core::StepId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Fill `out` with uniforms in `[0, 1)` for `step`, one per slot.
pub fn fill_noise(seed: u64, step: StepId, out: &mut [f32]) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ step.0);
    for v in out.iter_mut() {
        *v = rng.random::<f32>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_and_step_repeat() {
        let mut a = [0.0; 32];
        let mut b = [0.0; 32];
        fill_noise(7, StepId(3), &mut a);
        fill_noise(7, StepId(3), &mut b);
        assert_eq!(a, b);
        assert!(a.iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn steps_draw_different_samples() {
        let mut a = [0.0; 8];
        let mut b = [0.0; 8];
        fill_noise(7, StepId(3), &mut a);
        fill_noise(7, StepId(4), &mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn prefix_is_independent_of_length() {
        let mut short = [0.0; 4];
        let mut long = [0.0; 16];
        fill_noise(1, StepId(1), &mut short);
        fill_noise(1, StepId(1), &mut long);
        assert_eq!(short, long[..4]);
    }
}
