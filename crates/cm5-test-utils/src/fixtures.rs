//! Option presets for tests and benches.

use cm5_core::{CellSeed, Parameters};
use cm5_engine::SimulatorOptions;

/// One founder cell, room for 64, fixed seed.
pub fn small_options() -> SimulatorOptions {
    SimulatorOptions {
        capacity: 64,
        parameters: Parameters {
            seed: 7,
            ..Parameters::default()
        },
        ..SimulatorOptions::default()
    }
}

/// A row of `n` touching cells of alternating type, room for `capacity`.
pub fn row_options(n: usize, capacity: usize) -> SimulatorOptions {
    let initial_cells = (0..n)
        .map(|i| CellSeed {
            position: [0.0, i as f32 * 0.9, 0.0],
            cell_type: (i % 3) as u32,
            ..CellSeed::default()
        })
        .collect();
    SimulatorOptions {
        capacity,
        parameters: Parameters {
            seed: 11,
            ..Parameters::default()
        },
        initial_cells,
        ..SimulatorOptions::default()
    }
}

/// A fresh, empty directory under the system temp dir for `name`.
pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("cm5-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
