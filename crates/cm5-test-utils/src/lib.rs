//! Test utilities for cm5 development.
//!
//! Provides the engine's WGSL sources compiled into the binary, a
//! recording [`MapLoader`], a fault-injecting [`FaultyExecutor`], and
//! small option presets in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cm5_engine::{
    BindError, CpuExecutor, ExecutionError, ExecutionReport, Executor, LoadError, ShaderLoader,
    StagePlan, StepFrame, REQUIRED_SHADERS,
};
use cm5_shader::ProgramRegistry;
use indexmap::IndexMap;

pub const GROWTH_WGSL: &str = include_str!("../../../shaders/growth.wgsl");
pub const DIVISION_WGSL: &str = include_str!("../../../shaders/division.wgsl");
pub const CONTACT_WGSL: &str = include_str!("../../../shaders/contact.wgsl");
pub const INTEGRATE_WGSL: &str = include_str!("../../../shaders/integrate.wgsl");

/// Built-in source for one of [`REQUIRED_SHADERS`].
pub fn builtin_source(path: &str) -> Option<&'static str> {
    match path {
        "shaders/growth.wgsl" => Some(GROWTH_WGSL),
        "shaders/division.wgsl" => Some(DIVISION_WGSL),
        "shaders/contact.wgsl" => Some(CONTACT_WGSL),
        "shaders/integrate.wgsl" => Some(INTEGRATE_WGSL),
        _ => None,
    }
}

// ── MapLoader ──────────────────────────────────────────────────────

/// In-memory loader that records every path it is asked for.
#[derive(Clone, Debug, Default)]
pub struct MapLoader {
    sources: IndexMap<String, String>,
    calls: Vec<String>,
}

impl MapLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader serving every required shader.
    pub fn builtin() -> Self {
        let mut loader = Self::new();
        for path in REQUIRED_SHADERS {
            if let Some(text) = builtin_source(path) {
                loader.sources.insert(path.to_string(), text.to_string());
            }
        }
        loader
    }

    /// Serve `text` for `path`, replacing any existing source.
    pub fn with(mut self, path: &str, text: impl Into<String>) -> Self {
        self.sources.insert(path.to_string(), text.into());
        self
    }

    /// Stop serving `path`.
    pub fn without(mut self, path: &str) -> Self {
        self.sources.shift_remove(path);
        self
    }

    /// Paths requested so far, in call order.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }
}

impl ShaderLoader for MapLoader {
    fn load(&mut self, path: &str) -> Result<String, LoadError> {
        self.calls.push(path.to_string());
        self.sources.get(path).cloned().ok_or_else(|| LoadError {
            path: path.to_string(),
            reason: "no such shader".into(),
        })
    }
}

// ── FaultyExecutor ─────────────────────────────────────────────────

/// What a [`FaultyExecutor`] does on its faulty call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Scribble over the frame, then report a backend error.
    Error,
    /// Poison a live cell so the host kernels produce a NaN.
    NonFinite,
}

/// Host executor that injects a fault on its `n`th `execute` call.
///
/// Every other call is delegated to a [`CpuExecutor`] unchanged.
#[derive(Debug)]
pub struct FaultyExecutor {
    inner: CpuExecutor,
    fail_on: u64,
    fault: Fault,
    calls: Arc<AtomicU64>,
}

impl FaultyExecutor {
    /// Fault on the `n`th call (1-based).
    pub fn on_call(n: u64, fault: Fault) -> Self {
        Self {
            inner: CpuExecutor::new(),
            fail_on: n,
            fault,
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared counter of `execute` calls, readable after the executor
    /// has been moved into a simulator.
    pub fn call_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.calls)
    }
}

impl Executor for FaultyExecutor {
    fn name(&self) -> &str {
        "faulty-cpu"
    }

    fn bind(&mut self, registry: &ProgramRegistry) -> Result<(), Vec<BindError>> {
        self.inner.bind(registry)
    }

    fn execute(
        &mut self,
        plan: &StagePlan,
        frame: StepFrame<'_>,
    ) -> Result<ExecutionReport, ExecutionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call != self.fail_on {
            return self.inner.execute(plan, frame);
        }
        match self.fault {
            Fault::Error => {
                for cell in frame.cells.iter_mut() {
                    cell.position = [f32::NAN; 3];
                }
                frame.meta.cell_count = 0;
                Err(ExecutionError::Failed {
                    stage: "injected".into(),
                    reason: format!("fault injected on call {call}"),
                })
            }
            Fault::NonFinite => {
                if let Some(cell) = frame.cells.first_mut() {
                    cell.growth_rate = f32::NAN;
                }
                self.inner.execute(plan, frame)
            }
        }
    }
}
