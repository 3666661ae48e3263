//! Host executor: runs each program's entry point as native Rust.
//!
//! Every kernel here is a sequential rendition of the matching WGSL
//! entry point in `shaders/`. The GPU kernels are race-free (each
//! invocation writes only its own slots), so a sequential pass over the
//! slots produces the same buffers.
//!
//! A program only binds when its canonical WGSL equals that of the
//! kernel the host code renders. Reformatted or recommented copies of the
//! engine shaders bind; any other program is rejected at construction.

mod contact;
mod division;
mod growth;
mod integrate;

use std::time::Instant;

use cm5_core::ShaderId;
use cm5_shader::{canonical_wgsl, BindingKind, CompiledProgram, ProgramRegistry};
use indexmap::IndexMap;

use crate::executor::{BindError, ExecutionError, ExecutionReport, Executor, StepFrame};
use crate::plan::StagePlan;

type KernelFn = fn(&mut StepFrame<'_>);

type Vec3 = cgmath::Vector3<f32>;

/// Expected `(binding, kind, stride)` of one group-0 resource.
type Slot = (u32, BindingKind, Option<u32>);

const UNIFORM: Slot = (0, BindingKind::Uniform, None);

const GROWTH_WGSL: &str = include_str!("../../../../shaders/growth.wgsl");
const DIVISION_WGSL: &str = include_str!("../../../../shaders/division.wgsl");
const CONTACT_WGSL: &str = include_str!("../../../../shaders/contact.wgsl");
const INTEGRATE_WGSL: &str = include_str!("../../../../shaders/integrate.wgsl");

/// A host kernel, the resource layout its program must declare, and the
/// WGSL it renders.
struct HostKernel {
    entry_point: &'static str,
    run: KernelFn,
    abi: &'static [Slot],
    reference: &'static str,
}

const KERNELS: [HostKernel; 4] = [
    HostKernel {
        entry_point: "grow",
        run: growth::grow,
        abi: &[UNIFORM, (1, BindingKind::StorageReadWrite, Some(64))],
        reference: GROWTH_WGSL,
    },
    HostKernel {
        entry_point: "divide",
        run: division::divide,
        abi: &[
            UNIFORM,
            (1, BindingKind::StorageReadWrite, Some(64)),
            (3, BindingKind::StorageRead, Some(4)),
            (4, BindingKind::StorageReadWrite, None),
        ],
        reference: DIVISION_WGSL,
    },
    HostKernel {
        entry_point: "contact",
        run: contact::contact,
        abi: &[
            UNIFORM,
            (1, BindingKind::StorageRead, Some(64)),
            (2, BindingKind::StorageReadWrite, Some(32)),
            (4, BindingKind::StorageRead, None),
        ],
        reference: CONTACT_WGSL,
    },
    HostKernel {
        entry_point: "integrate",
        run: integrate::integrate,
        abi: &[
            UNIFORM,
            (1, BindingKind::StorageReadWrite, Some(64)),
            (2, BindingKind::StorageRead, Some(32)),
            (4, BindingKind::StorageRead, None),
        ],
        reference: INTEGRATE_WGSL,
    },
];

fn link(program: &CompiledProgram) -> Result<KernelFn, BindError> {
    let fail = |reason: String| BindError {
        shader: program.id().clone(),
        reason,
    };
    let kernel = KERNELS
        .iter()
        .find(|k| k.entry_point == program.entry_point())
        .ok_or_else(|| {
            fail(format!(
                "no host kernel implements entry point '{}'",
                program.entry_point()
            ))
        })?;

    let declared: Vec<Slot> = program
        .bindings()
        .iter()
        .map(|b| {
            if b.group != 0 {
                Err(fail(format!(
                    "binding '{}' is in group {}, expected group 0",
                    b.name, b.group
                )))
            } else {
                Ok((b.binding, b.kind, b.stride))
            }
        })
        .collect::<Result<_, _>>()?;
    if declared != kernel.abi {
        return Err(fail(format!(
            "resource layout {declared:?} does not match '{}' layout {:?}",
            kernel.entry_point, kernel.abi
        )));
    }

    let reference = canonical_wgsl(kernel.reference).ok_or_else(|| {
        fail(format!(
            "host kernel '{}' has no valid WGSL rendition",
            kernel.entry_point
        ))
    })?;
    if program.canonical_source() != reference {
        return Err(fail(format!(
            "program body differs from the '{}' kernel the cpu backend implements",
            kernel.entry_point
        )));
    }
    Ok(kernel.run)
}

// ── CpuExecutor ────────────────────────────────────────────────────

/// Executor that runs the host kernels on the calling thread.
#[derive(Debug, Default)]
pub struct CpuExecutor {
    linked: IndexMap<ShaderId, KernelFn>,
}

impl CpuExecutor {
    /// Create an executor with nothing bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `program` has been bound.
    pub fn is_bound(&self, program: &str) -> bool {
        self.linked.contains_key(program)
    }
}

impl Executor for CpuExecutor {
    fn name(&self) -> &str {
        "cpu"
    }

    fn bind(&mut self, registry: &ProgramRegistry) -> Result<(), Vec<BindError>> {
        let mut linked = IndexMap::with_capacity(registry.len());
        let mut errors = Vec::new();
        for program in registry.iter() {
            match link(program) {
                Ok(run) => {
                    linked.insert(program.id().clone(), run);
                }
                Err(e) => errors.push(e),
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        log::debug!("cpu executor bound {} program(s)", linked.len());
        self.linked = linked;
        Ok(())
    }

    fn execute(
        &mut self,
        plan: &StagePlan,
        mut frame: StepFrame<'_>,
    ) -> Result<ExecutionReport, ExecutionError> {
        let mut report = ExecutionReport {
            stage_us: Vec::with_capacity(plan.len()),
            dispatches: 0,
        };
        for stage in plan.stages() {
            let run = self
                .linked
                .get(&stage.program)
                .ok_or_else(|| ExecutionError::Failed {
                    stage: stage.program.to_string(),
                    reason: "program is not bound".into(),
                })?;
            let start = Instant::now();
            run(&mut frame);
            report
                .stage_us
                .push((stage.program.to_string(), start.elapsed().as_micros() as u64));
            report.dispatches += 1;

            let live = (frame.meta.cell_count as usize).min(frame.cells.len());
            if let Some(cell) = frame.cells[..live].iter().position(|c| !c.is_finite()) {
                return Err(ExecutionError::NonFinite {
                    stage: stage.program.to_string(),
                    cell,
                });
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use cm5_core::{Cell, CellFlags, ContactAccum, KernelParams, Parameters, StepMeta};
    use cm5_shader::{CompilerConfig, ShaderCompiler, ShaderSource};

    /// Hand-built buffers for driving one kernel at a time.
    pub(crate) struct Fixture {
        pub cells: Vec<Cell>,
        pub meta: StepMeta,
        pub contacts: Vec<ContactAccum>,
        pub noise: Vec<f32>,
    }

    impl Fixture {
        pub fn new(capacity: usize) -> Self {
            Self {
                cells: vec![Cell::default(); capacity],
                meta: StepMeta::default(),
                contacts: vec![ContactAccum::default(); capacity],
                noise: vec![0.0; capacity],
            }
        }

        /// Append a live cell at the origin pointing along +x.
        pub fn push(&mut self, length: f32, radius: f32, growth_rate: f32, target_length: f32) {
            let slot = self.meta.cell_count as usize;
            self.cells[slot] = Cell {
                position: [0.0; 3],
                length,
                direction: [1.0, 0.0, 0.0],
                radius,
                velocity: [0.0; 3],
                growth_rate,
                target_length,
                cell_type: 0,
                id: self.meta.next_cell_id,
                flags: CellFlags::ALIVE,
            };
            self.meta.cell_count += 1;
            self.meta.next_cell_id += 1;
        }

        pub fn run(&mut self, kernel: KernelFn) {
            let params = KernelParams::for_step(
                &Parameters::default(),
                &self.meta,
                self.cells.len() as u32,
            );
            let mut frame = StepFrame {
                params,
                cells: &mut self.cells,
                meta: &mut self.meta,
                contacts: &mut self.contacts,
                noise: &self.noise,
            };
            kernel(&mut frame);
        }
    }

    fn registry(sources: &[(&str, &str)]) -> ProgramRegistry {
        let session = ShaderCompiler::startup(CompilerConfig::default()).unwrap();
        let mut reg = ProgramRegistry::new();
        for (path, text) in sources {
            reg.insert(session.compile(&ShaderSource::new(*path, *text)).unwrap())
                .unwrap();
        }
        reg
    }

    fn engine_shaders() -> ProgramRegistry {
        registry(&[
            ("shaders/growth.wgsl", GROWTH_WGSL),
            ("shaders/division.wgsl", DIVISION_WGSL),
            ("shaders/contact.wgsl", CONTACT_WGSL),
            ("shaders/integrate.wgsl", INTEGRATE_WGSL),
        ])
    }

    #[test]
    fn binds_engine_shaders() {
        let mut exec = CpuExecutor::new();
        exec.bind(&engine_shaders()).unwrap();
        for id in ["growth", "division", "contact", "integrate"] {
            assert!(exec.is_bound(id), "{id}");
        }
    }

    #[test]
    fn unknown_entry_point_is_a_bind_error() {
        let reg = registry(&[("x/extra.wgsl", "@compute @workgroup_size(1) fn main() {}")]);
        let errors = CpuExecutor::new().bind(&reg).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].shader.as_str(), "extra");
        assert!(errors[0].reason.contains("'main'"));
    }

    #[test]
    fn layout_mismatch_is_a_bind_error() {
        let src = "
            @group(0) @binding(1) var<storage, read_write> cells: array<u32>;
            @compute @workgroup_size(64)
            fn grow(@builtin(global_invocation_id) gid: vec3<u32>) {
                cells[gid.x] = 0u;
            }";
        let reg = registry(&[("shaders/growth.wgsl", src)]);
        let errors = CpuExecutor::new().bind(&reg).unwrap_err();
        assert!(errors[0].reason.contains("does not match 'grow'"));
    }

    #[test]
    fn recommented_kernel_still_binds() {
        let text = format!("// local copy\n\n{}", INTEGRATE_WGSL.replace("    ", "\t"));
        let reg = registry(&[("vendor/integrate.wgsl", text.as_str())]);
        let mut exec = CpuExecutor::new();
        exec.bind(&reg).unwrap();
        assert!(exec.is_bound("integrate"));
    }

    #[test]
    fn altered_kernel_body_is_a_bind_error() {
        let faster = GROWTH_WGSL.replace(
            "params.dt * cell.growth_rate",
            "10.0 * params.dt * cell.growth_rate",
        );
        assert_ne!(faster, GROWTH_WGSL);
        let reg = registry(&[("shaders/growth.wgsl", faster.as_str())]);
        let errors = CpuExecutor::new().bind(&reg).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].shader.as_str(), "growth");
        assert!(errors[0].reason.contains("differs from the 'grow' kernel"));
    }

    #[test]
    fn unbound_stage_fails_execution() {
        let mut fx = Fixture::new(1);
        let params = KernelParams::for_step(&Parameters::default(), &fx.meta, 1);
        let frame = StepFrame {
            params,
            cells: &mut fx.cells,
            meta: &mut fx.meta,
            contacts: &mut fx.contacts,
            noise: &fx.noise,
        };
        let err = CpuExecutor::new()
            .execute(&StagePlan::standard(1), frame)
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Failed { ref stage, .. } if stage == "growth"));
    }

    #[test]
    fn full_plan_reports_every_dispatch() {
        let mut exec = CpuExecutor::new();
        exec.bind(&engine_shaders()).unwrap();
        let mut fx = Fixture::new(4);
        fx.push(2.0, 0.5, 1.0, 3.5);
        fx.push(2.0, 0.5, 1.0, 3.5);
        fx.cells[1].position = [0.0, 0.9, 0.0];
        let plan = StagePlan::standard(3);
        let params = KernelParams::for_step(&Parameters::default(), &fx.meta, 4);
        let frame = StepFrame {
            params,
            cells: &mut fx.cells,
            meta: &mut fx.meta,
            contacts: &mut fx.contacts,
            noise: &fx.noise,
        };
        let report = exec.execute(&plan, frame).unwrap();
        assert_eq!(report.dispatches, 8);
        assert_eq!(report.stage_us.len(), 8);
        assert_eq!(report.stage_us[0].0, "growth");
        // Relaxation moved the pair apart.
        assert!(fx.cells[1].position[1] - fx.cells[0].position[1] > 0.9);
    }

    #[test]
    fn non_finite_output_names_the_stage() {
        let mut exec = CpuExecutor::new();
        exec.bind(&engine_shaders()).unwrap();
        let mut fx = Fixture::new(2);
        fx.push(2.0, 0.5, f32::INFINITY, 3.5);
        let params = KernelParams::for_step(&Parameters::default(), &fx.meta, 2);
        let frame = StepFrame {
            params,
            cells: &mut fx.cells,
            meta: &mut fx.meta,
            contacts: &mut fx.contacts,
            noise: &fx.noise,
        };
        let err = exec.execute(&StagePlan::standard(1), frame).unwrap_err();
        assert_eq!(
            err,
            ExecutionError::NonFinite {
                stage: "growth".into(),
                cell: 0
            }
        );
    }
}
