//! Benchmark profiles for the cm5 colony simulator.
//!
//! - [`grid_profile`]: a square lattice of founder cells
//! - [`grown_state`]: step a profile forward to get a realistic colony

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use cm5_core::{CellSeed, Parameters};
use cm5_engine::{ShaderLoader, Simulator, SimulatorOptions};

/// `side * side` founder cells on a lattice with pitch 3, alternating
/// orientation, room for `capacity`.
pub fn grid_profile(side: usize, capacity: usize, seed: u64) -> SimulatorOptions {
    let mut initial_cells = Vec::with_capacity(side * side);
    for row in 0..side {
        for col in 0..side {
            let along_x = (row + col) % 2 == 0;
            initial_cells.push(CellSeed {
                position: [col as f32 * 3.0, row as f32 * 3.0, 0.0],
                direction: if along_x { [1.0, 0.0, 0.0] } else { [0.0, 1.0, 0.0] },
                cell_type: ((row * side + col) % 3) as u32,
                ..CellSeed::default()
            });
        }
    }
    SimulatorOptions {
        capacity,
        parameters: Parameters {
            seed,
            ..Parameters::default()
        },
        initial_cells,
        ..SimulatorOptions::default()
    }
}

/// Build a simulator from `options` and advance it `steps` times.
pub fn grown_state(
    options: SimulatorOptions,
    loader: &mut dyn ShaderLoader,
    steps: u64,
) -> Result<Simulator, Box<dyn std::error::Error>> {
    let mut sim = Simulator::new(options, loader)?;
    for _ in 0..steps {
        sim.step()?;
    }
    Ok(sim)
}
