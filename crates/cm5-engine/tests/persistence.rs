//! Integration test: step-file resumption and viz export.
//!
//! A run saved after three steps and resumed for one more must be
//! bit-identical to a run of four steps. Exports never change the
//! simulator they read from.

use cm5_core::StepId;
use cm5_engine::{ConfigError, InitError, Simulator, MAX_CAPACITY};
use cm5_io::hash::fnv1a;
use cm5_io::{read_step_file, read_viz_file, CodecError};
use cm5_shader::Target;
use cm5_test_utils::fixtures::{row_options, scratch_dir, small_options};
use cm5_test_utils::MapLoader;

fn run(steps: u64) -> Simulator {
    let mut sim = Simulator::new(small_options(), &mut MapLoader::builtin()).unwrap();
    for _ in 0..steps {
        sim.step().unwrap();
    }
    sim
}

#[test]
fn save_resume_step_equals_uninterrupted() {
    let dir = scratch_dir("resume");
    let path = dir.join("three.cm5s");
    run(3).write_step_file(&path).unwrap();

    let mut resumed = Simulator::resume(&path, Target::Cpu, &mut MapLoader::builtin()).unwrap();
    assert_eq!(resumed.step_count(), StepId(3));
    resumed.step().unwrap();

    let straight = run(4);
    assert_eq!(resumed.step_count(), StepId(4));
    assert!(resumed.state().same_bits(straight.state()));
    assert_eq!(resumed.parameters(), straight.parameters());
}

#[test]
fn resume_mid_division_continues_the_run() {
    let dir = scratch_dir("resume-crowded");
    let path = dir.join("fifteen.cm5s");
    let options = || row_options(5, 40);

    let mut saved = Simulator::new(options(), &mut MapLoader::builtin()).unwrap();
    for _ in 0..15 {
        saved.step().unwrap();
    }
    // The saved colony has already divided and is in contact.
    assert!(saved.state().cell_count() > 5);
    assert_eq!(saved.state().meta().next_cell_id as usize, saved.state().cell_count());
    saved.write_step_file(&path).unwrap();

    let mut resumed = Simulator::resume(&path, Target::Cpu, &mut MapLoader::builtin()).unwrap();
    let mut straight = Simulator::new(options(), &mut MapLoader::builtin()).unwrap();
    for _ in 0..15 {
        straight.step().unwrap();
    }
    assert!(resumed.state().same_bits(straight.state()));

    let mut divisions = 0;
    for _ in 0..15 {
        divisions += resumed.step().unwrap().divisions;
        straight.step().unwrap();
    }
    assert!(divisions > 0);
    assert_eq!(resumed.step_count(), StepId(30));
    assert!(resumed.state().same_bits(straight.state()));
}

#[test]
fn step_file_round_trip_is_exact() {
    let dir = scratch_dir("roundtrip");
    let path = dir.join("colony.cm5s");
    let mut sim = Simulator::new(row_options(4, 32), &mut MapLoader::builtin()).unwrap();
    for _ in 0..12 {
        sim.step().unwrap();
    }
    sim.write_step_file(&path).unwrap();
    let file = read_step_file(&path).unwrap();
    assert!(file.state.same_bits(sim.state()));
    assert_eq!(&file.parameters, sim.parameters());
}

#[test]
fn viz_export_is_read_only() {
    let dir = scratch_dir("viz");
    let mut sim = run(5);
    let before = sim.state().clone();
    sim.write_viz_file(dir.join("a.cm5v")).unwrap();
    sim.write_viz_file(dir.join("b.cm5v")).unwrap();
    assert!(sim.state().same_bits(&before));

    let frame = read_viz_file(&dir.join("a.cm5v")).unwrap();
    assert_eq!(frame, sim.viz_frame());
    assert_eq!(frame.cells.len(), sim.state().cell_count());

    // Exporting did not perturb the run.
    sim.step().unwrap();
    assert!(sim.state().same_bits(run(6).state()));
}

#[test]
fn failed_export_leaves_no_file() {
    let dir = scratch_dir("badexport");
    let target = dir.join("missing").join("colony.cm5s");
    assert!(matches!(
        run(1).write_step_file(&target),
        Err(CodecError::Io(_))
    ));
    assert!(!target.exists());
}

#[test]
fn resume_rejects_corrupt_files() {
    let dir = scratch_dir("corrupt");
    let path = dir.join("colony.cm5s");
    run(2).write_step_file(&path).unwrap();
    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    std::fs::write(&path, bytes).unwrap();

    let err = Simulator::resume(&path, Target::Cpu, &mut MapLoader::builtin()).unwrap_err();
    assert!(matches!(
        err,
        InitError::Codec(CodecError::ChecksumMismatch { .. })
    ));
}

#[test]
fn resume_refuses_capacity_beyond_the_simulator_limit() {
    let dir = scratch_dir("oversized");
    let path = dir.join("colony.cm5s");
    let sim = run(0);
    sim.write_step_file(&path).unwrap();

    // Patch the capacity field and re-sign, so only the limit is wrong.
    let mut bytes = std::fs::read(&path).unwrap();
    let params_len = 8 + 4 + 4 + 1 + 4 + 4 + 8 + 4 + 4 + sim.parameters().palette.len() * 12;
    let at = 5 + params_len + 8;
    let oversized = MAX_CAPACITY as u32 + 1;
    bytes[at..at + 4].copy_from_slice(&oversized.to_le_bytes());
    let body = bytes.len() - 8;
    let sum = fnv1a(&bytes[..body]);
    bytes[body..].copy_from_slice(&sum.to_le_bytes());
    std::fs::write(&path, bytes).unwrap();

    let err = Simulator::resume(&path, Target::Cpu, &mut MapLoader::builtin()).unwrap_err();
    assert!(
        matches!(
            err,
            InitError::Codec(CodecError::Malformed { .. })
                | InitError::Config(ConfigError::InvalidCapacity { .. })
        ),
        "{err}"
    );
}
