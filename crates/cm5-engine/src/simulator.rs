//! The stepped colony simulator.
//!
//! [`Simulator`] owns the imported program set, an executor, and two
//! copies of the colony state. Each [`step()`](Simulator::step) runs the
//! stage plan against the back copy and only swaps it in once every
//! stage has succeeded and the result passes verification, so a failed
//! step leaves the visible state and step counter untouched.
//!
//! # Ownership model
//!
//! `Simulator` is [`Send`] but not required to be [`Sync`]. Stepping
//! takes `&mut self` and the exports take `&self`, so an export can
//! never observe a half-written step.

use std::path::Path;
use std::time::Instant;

use cm5_core::{ContactAccum, KernelParams, Parameters, SimulationState, StateError, StepId};
use cm5_io::{CodecError, VizFrame};
use cm5_shader::{CompilerConfig, CompilerSession, ProgramRegistry, ShaderCompiler, Target};

use crate::config::{validate_parameters, ConfigError, SimulatorOptions, MAX_CAPACITY};
use crate::cpu::CpuExecutor;
use crate::error::{InitError, StepExecutionError};
use crate::executor::{Executor, StepFrame};
use crate::import::{import_shaders, ImportError, ShaderFailure, REQUIRED_SHADERS};
use crate::loader::ShaderLoader;
use crate::metrics::StepMetrics;
use crate::noise::fill_noise;
use crate::plan::StagePlan;

// Compile-time assertion: Simulator is Send.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Simulator>();
    }
};

/// Stage name used for failures found after the executor returns.
const VERIFY_STAGE: &str = "verify";

// ── Simulator ──────────────────────────────────────────────────────

/// A colony simulation with its compiled shaders and backend.
///
/// # Example
///
/// ```ignore
/// let mut loader = FsLoader::new(".");
/// let mut sim = Simulator::new(SimulatorOptions::default(), &mut loader)?;
/// for _ in 0..100 {
///     sim.step()?;
/// }
/// sim.write_step_file("colony.cm5s")?;
/// ```
pub struct Simulator {
    parameters: Parameters,
    plan: StagePlan,
    front: SimulationState,
    back: SimulationState,
    contacts: Vec<ContactAccum>,
    noise: Vec<f32>,
    executor: Box<dyn Executor>,
    registry: ProgramRegistry,
    session: CompilerSession,
    last_metrics: StepMetrics,
    consecutive_failures: u32,
    capacity_warned: bool,
}

impl Simulator {
    /// Build a simulator from `options`, loading shaders through `loader`.
    ///
    /// Validates the options, allocates the state, starts the compiler
    /// for `options.target`, imports and binds every required shader,
    /// then places the initial cells.
    pub fn new(
        options: SimulatorOptions,
        loader: &mut dyn ShaderLoader,
    ) -> Result<Self, InitError> {
        options.validate()?;
        let state = SimulationState::with_capacity(options.capacity)?;
        let session = ShaderCompiler::startup(CompilerConfig::for_target(options.target))?;
        let executor = default_executor(&session)?;
        let mut sim = Self::assemble(options.parameters, state, session, executor, loader)?;
        sim.seed(&options.initial_cells)?;
        Ok(sim)
    }

    /// Like [`new`](Self::new), but running on `executor` instead of the
    /// backend for `options.target`.
    pub fn with_executor(
        options: SimulatorOptions,
        loader: &mut dyn ShaderLoader,
        executor: Box<dyn Executor>,
    ) -> Result<Self, InitError> {
        options.validate()?;
        let state = SimulationState::with_capacity(options.capacity)?;
        let session = ShaderCompiler::startup(CompilerConfig::for_target(options.target))?;
        let mut sim = Self::assemble(options.parameters, state, session, executor, loader)?;
        sim.seed(&options.initial_cells)?;
        Ok(sim)
    }

    /// Resume the run stored in the step file at `path`.
    ///
    /// The resumed simulator has the stored parameters, cells, and step
    /// counter, so stepping it continues the original run exactly.
    pub fn resume(
        path: impl AsRef<Path>,
        target: Target,
        loader: &mut dyn ShaderLoader,
    ) -> Result<Self, InitError> {
        let path = path.as_ref();
        let file = cm5_io::read_step_file(path)?;
        validate_parameters(&file.parameters)?;
        if file.state.capacity() > MAX_CAPACITY {
            return Err(ConfigError::InvalidCapacity {
                value: file.state.capacity(),
            }
            .into());
        }
        let session = ShaderCompiler::startup(CompilerConfig::for_target(target))?;
        let executor = default_executor(&session)?;
        let sim = Self::assemble(file.parameters, file.state, session, executor, loader)?;
        log::info!(
            "resumed {} at step {} with {} cells",
            path.display(),
            sim.front.step(),
            sim.front.cell_count()
        );
        Ok(sim)
    }

    fn assemble(
        parameters: Parameters,
        front: SimulationState,
        session: CompilerSession,
        mut executor: Box<dyn Executor>,
        loader: &mut dyn ShaderLoader,
    ) -> Result<Self, InitError> {
        let registry = import_shaders(&session, &REQUIRED_SHADERS, loader)?;
        if let Err(errors) = executor.bind(&registry) {
            for e in &errors {
                log::warn!("{} executor: {e}", executor.name());
            }
            return Err(ImportError {
                failures: errors.into_iter().map(ShaderFailure::Bind).collect(),
            }
            .into());
        }

        let capacity = front.capacity();
        let back = SimulationState::with_capacity(capacity)?;
        let contacts = zeroed(capacity)?;
        let noise = zeroed(capacity)?;
        let plan = StagePlan::standard(parameters.contact_iterations);

        log::info!(
            "simulator ready: {} backend, capacity {capacity}, {} stages per step",
            executor.name(),
            plan.len()
        );

        Ok(Self {
            parameters,
            plan,
            front,
            back,
            contacts,
            noise,
            executor,
            registry,
            session,
            last_metrics: StepMetrics::default(),
            consecutive_failures: 0,
            capacity_warned: false,
        })
    }

    fn seed(&mut self, cells: &[cm5_core::CellSeed]) -> Result<(), StateError> {
        fill_noise(self.parameters.seed, StepId(0), &mut self.noise);
        for seed in cells {
            let slot = self.front.cell_count();
            self.front.spawn(seed, &self.parameters, self.noise[slot])?;
        }
        Ok(())
    }

    // ── Stepping ───────────────────────────────────────────────────

    /// Advance the colony by one step.
    ///
    /// On success the step counter increases by one and the step's
    /// metrics are returned. On failure nothing observable changes
    /// apart from [`consecutive_failures()`](Self::consecutive_failures).
    pub fn step(&mut self) -> Result<&StepMetrics, StepExecutionError> {
        let start = Instant::now();
        match self.run_step() {
            Ok(mut metrics) => {
                std::mem::swap(&mut self.front, &mut self.back);
                self.consecutive_failures = 0;
                metrics.total_us = start.elapsed().as_micros() as u64;
                log::trace!(
                    "step {}: {} cells, {} divisions, {} us",
                    self.front.step(),
                    metrics.cells,
                    metrics.divisions,
                    metrics.total_us
                );
                if !self.capacity_warned && self.front.cell_count() == self.front.capacity() {
                    self.capacity_warned = true;
                    log::warn!(
                        "colony reached capacity {} at step {}; further divisions are deferred",
                        self.front.capacity(),
                        self.front.step()
                    );
                }
                self.last_metrics = metrics;
                Ok(&self.last_metrics)
            }
            Err(e) => {
                self.consecutive_failures += 1;
                log::warn!(
                    "step {} failed ({} in a row): {e}",
                    self.front.step().next(),
                    self.consecutive_failures
                );
                Err(e)
            }
        }
    }

    /// Run the plan on the back buffer and verify the result.
    fn run_step(&mut self) -> Result<StepMetrics, StepExecutionError> {
        self.back
            .copy_from(&self.front)
            .map_err(|e| verify_error(&e))?;
        fill_noise(self.parameters.seed, self.back.step().next(), &mut self.noise);

        let capacity = self.back.capacity() as u32;
        let params = KernelParams::for_step(&self.parameters, self.back.meta(), capacity);
        let (cells, meta) = self.back.buffers_mut();
        let frame = StepFrame {
            params,
            cells,
            meta,
            contacts: &mut self.contacts,
            noise: &self.noise,
        };
        let report = self.executor.execute(&self.plan, frame)?;

        self.back.validate().map_err(|e| verify_error(&e))?;
        if let Some(cell) = self.back.first_non_finite() {
            return Err(StepExecutionError::NonFinite {
                stage: VERIFY_STAGE.into(),
                cell,
            });
        }
        self.back.advance();

        Ok(StepMetrics {
            total_us: 0,
            stage_us: report.stage_us,
            dispatches: report.dispatches,
            cells: self.back.cell_count(),
            divisions: self.back.meta().divisions,
        })
    }

    // ── Exports ────────────────────────────────────────────────────

    /// Atomically write a step file for the current state to `path`.
    pub fn write_step_file(&self, path: impl AsRef<Path>) -> Result<(), CodecError> {
        cm5_io::write_step_file(path.as_ref(), &self.parameters, &self.front)
    }

    /// Atomically write a viz file for the current state to `path`.
    pub fn write_viz_file(&self, path: impl AsRef<Path>) -> Result<(), CodecError> {
        cm5_io::write_viz_file(path.as_ref(), &self.front, &self.parameters.palette)
    }

    /// The presentation view a viz file would contain.
    pub fn viz_frame(&self) -> VizFrame {
        VizFrame::from_state(&self.front, &self.parameters.palette)
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// The current colony state.
    pub fn state(&self) -> &SimulationState {
        &self.front
    }

    /// Steps completed so far.
    pub fn step_count(&self) -> StepId {
        self.front.step()
    }

    /// Run parameters.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Stages run by every step.
    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    /// The imported programs.
    pub fn registry(&self) -> &ProgramRegistry {
        &self.registry
    }

    /// Compiler target the programs were built for.
    pub fn target(&self) -> Target {
        self.session.target()
    }

    /// Name of the executor backend.
    pub fn executor_name(&self) -> &str {
        self.executor.name()
    }

    /// Metrics from the most recent successful step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// Failed steps since the last successful one.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("step", &self.front.step())
            .field("cells", &self.front.cell_count())
            .field("capacity", &self.front.capacity())
            .field("executor", &self.executor.name())
            .field("consecutive_failures", &self.consecutive_failures)
            .finish()
    }
}

fn verify_error(e: &StateError) -> StepExecutionError {
    StepExecutionError::Backend {
        stage: VERIFY_STAGE.into(),
        reason: e.to_string(),
    }
}

fn zeroed<T: Clone + Default>(capacity: usize) -> Result<Vec<T>, StateError> {
    let mut v = Vec::new();
    v.try_reserve_exact(capacity)
        .map_err(|_| StateError::Allocation { capacity })?;
    v.resize(capacity, T::default());
    Ok(v)
}

fn default_executor(session: &CompilerSession) -> Result<Box<dyn Executor>, InitError> {
    match session.target() {
        Target::Cpu => Ok(Box::new(CpuExecutor::new())),
        #[cfg(feature = "gpu")]
        Target::Gpu => Ok(Box::new(crate::gpu::GpuExecutor::new(session.clone())?)),
        #[cfg(not(feature = "gpu"))]
        Target::Gpu => Err(InitError::Compiler(
            cm5_shader::CompilerInitError::BackendUnavailable {
                target: Target::Gpu,
                reason: "built without the `gpu` feature".into(),
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin(path: &str) -> Result<String, String> {
        let text = match path {
            "shaders/growth.wgsl" => include_str!("../../../shaders/growth.wgsl"),
            "shaders/division.wgsl" => include_str!("../../../shaders/division.wgsl"),
            "shaders/contact.wgsl" => include_str!("../../../shaders/contact.wgsl"),
            "shaders/integrate.wgsl" => include_str!("../../../shaders/integrate.wgsl"),
            _ => return Err(format!("no such shader: {path}")),
        };
        Ok(text.to_string())
    }

    fn small() -> SimulatorOptions {
        SimulatorOptions {
            capacity: 64,
            ..SimulatorOptions::default()
        }
    }

    #[test]
    fn construction_seeds_initial_cells() {
        let sim = Simulator::new(small(), &mut builtin).unwrap();
        assert_eq!(sim.step_count(), StepId(0));
        assert_eq!(sim.state().cell_count(), 1);
        assert_eq!(sim.state().capacity(), 64);
        assert_eq!(sim.executor_name(), "cpu");
        assert_eq!(sim.registry().len(), 4);
        assert_eq!(sim.target(), Target::Cpu);
    }

    #[test]
    fn invalid_options_never_touch_the_loader() {
        let mut calls = 0;
        let mut loader = |_: &str| -> Result<String, String> {
            calls += 1;
            Err("unused".into())
        };
        let options = SimulatorOptions {
            capacity: 0,
            ..small()
        };
        let err = Simulator::new(options, &mut loader).unwrap_err();
        assert!(matches!(
            err,
            InitError::Config(ConfigError::InvalidCapacity { value: 0 })
        ));
        assert_eq!(calls, 0);
    }

    #[test]
    fn colony_grows_and_divides() {
        let mut sim = Simulator::new(small(), &mut builtin).unwrap();
        let mut divisions = 0;
        for _ in 0..40 {
            divisions += sim.step().unwrap().divisions;
        }
        assert_eq!(sim.step_count(), StepId(40));
        assert!(divisions >= 1);
        assert_eq!(sim.state().cell_count(), 1 + divisions as usize);
        assert!(sim.state().live_cells().iter().all(|c| c.position[2] == 0.0));
        assert_eq!(sim.last_metrics().dispatches, 10);
    }

    #[test]
    fn capacity_caps_the_colony() {
        let options = SimulatorOptions {
            capacity: 2,
            ..small()
        };
        let mut sim = Simulator::new(options, &mut builtin).unwrap();
        for _ in 0..120 {
            sim.step().unwrap();
        }
        assert_eq!(sim.state().cell_count(), 2);
        assert!(sim.capacity_warned);
    }

    #[test]
    fn viz_frame_matches_state() {
        let sim = Simulator::new(small(), &mut builtin).unwrap();
        let frame = sim.viz_frame();
        assert_eq!(frame.cells.len(), 1);
        assert_eq!(frame.cells[0].a, [-1.0, 0.0, 0.0]);
    }
}
