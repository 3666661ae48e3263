//! cm5 quickstart: grow a small colony and export it.
//!
//! Demonstrates:
//!   1. Loading the engine's shaders from the workspace `shaders/` dir
//!   2. Building a Simulator with a few founder cells
//!   3. Stepping and reading metrics
//!   4. Writing a step file and a viz file, then resuming from the step file
//!
//! Run with:
//!   cargo run -p cm5-engine --example quickstart

use cm5_core::{CellSeed, Parameters};
use cm5_engine::{FsLoader, Simulator, SimulatorOptions};
use cm5_shader::Target;

const STEPS: u64 = 60;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let root = concat!(env!("CARGO_MANIFEST_DIR"), "/../..");
    let mut loader = FsLoader::new(root);

    let options = SimulatorOptions {
        capacity: 512,
        parameters: Parameters {
            seed: 2024,
            ..Parameters::default()
        },
        initial_cells: vec![
            CellSeed::default(),
            CellSeed {
                position: [0.0, 4.0, 0.0],
                direction: [0.0, 1.0, 0.0],
                cell_type: 1,
                ..CellSeed::default()
            },
        ],
        target: Target::Cpu,
    };

    let mut sim = Simulator::new(options, &mut loader)?;
    for _ in 0..STEPS {
        let metrics = sim.step()?.clone();
        if metrics.divisions > 0 {
            println!(
                "step {:>3}: {:>3} cells (+{}) in {} us",
                sim.step_count(),
                metrics.cells,
                metrics.divisions,
                metrics.total_us
            );
        }
    }

    let out = std::env::temp_dir();
    let step_path = out.join("cm5-quickstart.cm5s");
    let viz_path = out.join("cm5-quickstart.cm5v");
    sim.write_step_file(&step_path)?;
    sim.write_viz_file(&viz_path)?;
    println!("wrote {} and {}", step_path.display(), viz_path.display());

    let mut resumed = Simulator::resume(&step_path, Target::Cpu, &mut loader)?;
    resumed.step()?;
    sim.step()?;
    assert!(resumed.state().same_bits(sim.state()));
    println!(
        "resumed run matches at step {} with {} cells",
        sim.step_count(),
        sim.state().cell_count()
    );
    Ok(())
}
