//! wgpu device acquisition for the GPU compiler target.

use std::fmt;

use crate::compiler::Target;
use crate::error::CompilerInitError;

/// Adapter, device, and queue shared by every program of a GPU session.
pub struct GpuContext {
    /// Device that pipelines are created on.
    pub device: wgpu::Device,
    /// Queue used for uploads and submissions.
    pub queue: wgpu::Queue,
    /// Information about the selected adapter.
    pub adapter: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Acquire a compute-capable device, blocking until it is ready.
    pub fn acquire() -> Result<Self, CompilerInitError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| CompilerInitError::BackendUnavailable {
            target: Target::Gpu,
            reason: format!("no suitable adapter: {e}"),
        })?;

        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("cm5_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| CompilerInitError::BackendUnavailable {
            target: Target::Gpu,
            reason: format!("failed to create device: {e}"),
        })?;

        Ok(Self {
            device,
            queue,
            adapter: info,
        })
    }
}

impl fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter", &self.adapter.name)
            .field("backend", &self.adapter.backend)
            .finish_non_exhaustive()
    }
}
