//! wgpu executor: runs the compiled WGSL on the session's device.
//!
//! Each program becomes a compute pipeline with an auto-derived layout.
//! A step uploads the frame, records one compute pass per stage into a
//! single command buffer, and blocks on reading the cell buffer and
//! colony bookkeeping back.

use indexmap::IndexMap;

use cm5_core::{Cell, ContactAccum, KernelParams, ShaderId, StepMeta};
use cm5_shader::{CompilerInitError, CompilerSession, GpuContext, ProgramRegistry, Target};

use crate::executor::{BindError, ExecutionError, ExecutionReport, Executor, StepFrame};
use crate::plan::{StageKind, StagePlan};

const PARAMS_BINDING: u32 = 0;
const CELLS_BINDING: u32 = 1;
const CONTACTS_BINDING: u32 = 2;
const NOISE_BINDING: u32 = 3;
const META_BINDING: u32 = 4;

/// Stage name reported for failures that cannot be tied to one dispatch.
const SUBMIT_STAGE: &str = "gpu";

struct Pipeline {
    pipeline: wgpu::ComputePipeline,
    bindings: Vec<u32>,
    workgroup: u32,
    bind_group: Option<wgpu::BindGroup>,
}

/// Device buffers for one capacity.
struct Buffers {
    capacity: usize,
    params: wgpu::Buffer,
    cells: wgpu::Buffer,
    contacts: wgpu::Buffer,
    noise: wgpu::Buffer,
    meta: wgpu::Buffer,
    readback: wgpu::Buffer,
}

impl Buffers {
    fn cells_bytes(&self) -> u64 {
        (self.capacity * std::mem::size_of::<Cell>()) as u64
    }

    fn binding(&self, binding: u32) -> Option<&wgpu::Buffer> {
        match binding {
            PARAMS_BINDING => Some(&self.params),
            CELLS_BINDING => Some(&self.cells),
            CONTACTS_BINDING => Some(&self.contacts),
            NOISE_BINDING => Some(&self.noise),
            META_BINDING => Some(&self.meta),
            _ => None,
        }
    }
}

// ── GpuExecutor ────────────────────────────────────────────────────

/// Executor backed by the GPU device of a compiler session.
pub struct GpuExecutor {
    session: CompilerSession,
    pipelines: IndexMap<ShaderId, Pipeline>,
    buffers: Option<Buffers>,
}

impl GpuExecutor {
    /// Create an executor on `session`'s device.
    ///
    /// Fails when the session was not started for [`Target::Gpu`].
    pub fn new(session: CompilerSession) -> Result<Self, CompilerInitError> {
        if session.gpu().is_none() {
            return Err(CompilerInitError::BackendUnavailable {
                target: Target::Gpu,
                reason: format!("compiler session targets {}", session.target()),
            });
        }
        Ok(Self {
            session,
            pipelines: IndexMap::new(),
            buffers: None,
        })
    }

    fn context(&self) -> Result<&GpuContext, ExecutionError> {
        self.session.gpu().ok_or_else(|| ExecutionError::Failed {
            stage: SUBMIT_STAGE.into(),
            reason: "session has no device".into(),
        })
    }

    /// (Re)create the device buffers and bind groups when the capacity changes.
    fn ensure_buffers(&mut self, capacity: usize) -> Result<(), ExecutionError> {
        if self.buffers.as_ref().is_some_and(|b| b.capacity == capacity) {
            return Ok(());
        }
        let session = self.session.clone();
        let device = &session
            .gpu()
            .ok_or_else(|| ExecutionError::Failed {
                stage: SUBMIT_STAGE.into(),
                reason: "session has no device".into(),
            })?
            .device;
        let storage = |label: &str, bytes: usize, extra: wgpu::BufferUsages| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: bytes.max(4) as u64,
                usage: wgpu::BufferUsages::STORAGE | extra,
                mapped_at_creation: false,
            })
        };
        let copy = wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC;
        let buffers = Buffers {
            capacity,
            params: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("cm5_params"),
                size: std::mem::size_of::<KernelParams>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
            cells: storage("cm5_cells", capacity * std::mem::size_of::<Cell>(), copy),
            contacts: storage(
                "cm5_contacts",
                capacity * std::mem::size_of::<ContactAccum>(),
                wgpu::BufferUsages::empty(),
            ),
            noise: storage(
                "cm5_noise",
                capacity * std::mem::size_of::<f32>(),
                wgpu::BufferUsages::COPY_DST,
            ),
            meta: storage("cm5_meta", std::mem::size_of::<StepMeta>(), copy),
            readback: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("cm5_readback"),
                size: ((capacity * std::mem::size_of::<Cell>()) + std::mem::size_of::<StepMeta>())
                    as u64,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
        };

        for (id, pipeline) in self.pipelines.iter_mut() {
            let layout = pipeline.pipeline.get_bind_group_layout(0);
            let mut entries = Vec::with_capacity(pipeline.bindings.len());
            for &binding in &pipeline.bindings {
                let buffer = buffers.binding(binding).ok_or_else(|| ExecutionError::Failed {
                    stage: id.to_string(),
                    reason: format!("no buffer for binding {binding}"),
                })?;
                entries.push(wgpu::BindGroupEntry {
                    binding,
                    resource: buffer.as_entire_binding(),
                });
            }
            pipeline.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(id.as_str()),
                layout: &layout,
                entries: &entries,
            }));
        }
        log::debug!("gpu buffers allocated for capacity {capacity}");
        self.buffers = Some(buffers);
        Ok(())
    }
}

impl Executor for GpuExecutor {
    fn name(&self) -> &str {
        "gpu"
    }

    fn bind(&mut self, registry: &ProgramRegistry) -> Result<(), Vec<BindError>> {
        let Some(ctx) = self.session.gpu() else {
            return Err(registry
                .ids()
                .map(|id| BindError {
                    shader: id.clone(),
                    reason: "session has no device".into(),
                })
                .collect());
        };
        let device = &ctx.device;
        let mut pipelines = IndexMap::with_capacity(registry.len());
        let mut errors = Vec::new();

        for program in registry.iter() {
            let fail = |reason: String| BindError {
                shader: program.id().clone(),
                reason,
            };
            if let Some(b) = program.bindings().iter().find(|b| b.group != 0) {
                errors.push(fail(format!("binding '{}' is in group {}", b.name, b.group)));
                continue;
            }
            if let Some(b) = program.bindings().iter().find(|b| b.binding > META_BINDING) {
                errors.push(fail(format!("unknown binding {} ('{}')", b.binding, b.name)));
                continue;
            }

            device.push_error_scope(wgpu::ErrorFilter::Validation);
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(program.path()),
                source: wgpu::ShaderSource::Wgsl(program.source().into()),
            });
            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(program.id().as_str()),
                layout: None,
                module: &module,
                entry_point: Some(program.entry_point()),
                compilation_options: Default::default(),
                cache: None,
            });
            if let Some(err) = pollster::block_on(device.pop_error_scope()) {
                errors.push(fail(err.to_string()));
                continue;
            }
            pipelines.insert(
                program.id().clone(),
                Pipeline {
                    pipeline,
                    bindings: program.bindings().iter().map(|b| b.binding).collect(),
                    workgroup: program.workgroup_size()[0].max(1),
                    bind_group: None,
                },
            );
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        log::debug!("gpu executor built {} pipeline(s)", pipelines.len());
        self.pipelines = pipelines;
        self.buffers = None;
        Ok(())
    }

    fn execute(
        &mut self,
        plan: &StagePlan,
        frame: StepFrame<'_>,
    ) -> Result<ExecutionReport, ExecutionError> {
        let start = std::time::Instant::now();
        let capacity = frame.cells.len();
        self.ensure_buffers(capacity)?;
        let ctx = self.context()?;
        let (device, queue) = (&ctx.device, &ctx.queue);
        let buffers = self.buffers.as_ref().ok_or_else(|| ExecutionError::Failed {
            stage: SUBMIT_STAGE.into(),
            reason: "device buffers missing".into(),
        })?;

        queue.write_buffer(&buffers.params, 0, bytemuck::bytes_of(&frame.params));
        queue.write_buffer(&buffers.cells, 0, bytemuck::cast_slice(frame.cells));
        queue.write_buffer(&buffers.meta, 0, bytemuck::bytes_of(frame.meta));
        queue.write_buffer(&buffers.noise, 0, bytemuck::cast_slice(frame.noise));

        let before = frame.params.cell_count as usize;
        let after = (before * 2).min(capacity);
        let mut passes = Vec::with_capacity(plan.len());
        for stage in plan.stages() {
            let pipeline =
                self.pipelines
                    .get(&stage.program)
                    .ok_or_else(|| ExecutionError::Failed {
                        stage: stage.program.to_string(),
                        reason: "program is not bound".into(),
                    })?;
            let bind_group = pipeline
                .bind_group
                .as_ref()
                .ok_or_else(|| ExecutionError::Failed {
                    stage: stage.program.to_string(),
                    reason: "bind group missing".into(),
                })?;
            // Division at most doubles the colony.
            let invocations = match stage.kind {
                StageKind::Growth | StageKind::Division => before,
                StageKind::Contact | StageKind::Integrate => after,
            };
            let groups = (invocations as u32).div_ceil(pipeline.workgroup);
            if groups > 0 {
                passes.push((stage.program.as_str(), pipeline, bind_group, groups));
            }
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("cm5_step"),
        });
        for &(label, pipeline, bind_group, groups) in &passes {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(groups, 1, 1);
        }
        let cells_bytes = buffers.cells_bytes();
        encoder.copy_buffer_to_buffer(&buffers.cells, 0, &buffers.readback, 0, cells_bytes);
        encoder.copy_buffer_to_buffer(
            &buffers.meta,
            0,
            &buffers.readback,
            cells_bytes,
            std::mem::size_of::<StepMeta>() as u64,
        );
        queue.submit(std::iter::once(encoder.finish()));
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(ExecutionError::Failed {
                stage: SUBMIT_STAGE.into(),
                reason: err.to_string(),
            });
        }

        let slice = buffers.readback.slice(..);
        let (tx, rx) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let mapped = match device.poll(wgpu::PollType::Wait) {
            Err(e) => Err(format!("device poll failed: {e}")),
            Ok(_) => match pollster::block_on(rx) {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(format!("readback failed: {e}")),
                Err(_) => Err("readback was cancelled".to_string()),
            },
        };
        if let Err(reason) = mapped {
            release(device, &buffers.readback);
            return Err(ExecutionError::Failed {
                stage: SUBMIT_STAGE.into(),
                reason,
            });
        }
        {
            let mapped = slice.get_mapped_range();
            let (cells, meta) = mapped.split_at(cells_bytes as usize);
            frame
                .cells
                .copy_from_slice(bytemuck::cast_slice::<u8, Cell>(cells));
            *frame.meta = bytemuck::pod_read_unaligned(meta);
        }
        buffers.readback.unmap();

        let live = (frame.meta.cell_count as usize).min(capacity);
        if let Some(cell) = frame.cells[..live].iter().position(|c| !c.is_finite()) {
            return Err(ExecutionError::NonFinite {
                stage: SUBMIT_STAGE.into(),
                cell,
            });
        }
        Ok(ExecutionReport {
            stage_us: vec![(SUBMIT_STAGE.into(), start.elapsed().as_micros() as u64)],
            dispatches: passes.len() as u32,
        })
    }
}

/// Unmap `buffer` after a failed or abandoned readback.
///
/// The buffer may still be pending or may never have been mapped; the
/// validation error the latter raises is captured and discarded.
fn release(device: &wgpu::Device, buffer: &wgpu::Buffer) {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    buffer.unmap();
    let _ = pollster::block_on(device.pop_error_scope());
}

impl std::fmt::Debug for GpuExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuExecutor")
            .field("pipelines", &self.pipelines.len())
            .field("capacity", &self.buffers.as_ref().map(|b| b.capacity))
            .finish_non_exhaustive()
    }
}
