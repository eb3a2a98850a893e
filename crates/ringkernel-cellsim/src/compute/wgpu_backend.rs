//! WGPU backend for kernel offload.
//!
//! Runs [`CELL_UPDATE_WGSL`](super::shader::CELL_UPDATE_WGSL) on any WebGPU
//! adapter (Vulkan, Metal, DX12). Both cell buffers stay on the device for
//! the lifetime of the scheduler; each tick uploads the current generation
//! and reads the next one back through a staging buffer.

use std::sync::Arc;

use parking_lot::Mutex;
use wgpu::util::DeviceExt;

use super::shader::{CELL_UPDATE_ENTRY, CELL_UPDATE_WGSL};
use super::{DeviceBuffers, KernelBackend, KernelParams};
use crate::error::{CellSimError, Result};

/// Kernel parameters (must match the WGSL `Params` layout).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct WgpuKernelParams {
    width: u32,
    height: u32,
    _pad0: u32,
    _pad1: u32,
}

/// WGPU storage buffer holding encoded cells.
pub struct WgpuBuffer {
    /// The WGPU buffer.
    buffer: wgpu::Buffer,
    /// Size in bytes.
    size: usize,
}

impl WgpuBuffer {
    fn new(device: &wgpu::Device, size: usize, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        Self { buffer, size }
    }

    /// Get the underlying buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Get buffer size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Cell update kernel on a WebGPU device.
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    limits: wgpu::Limits,
    adapter_name: String,
    /// Last uncaptured device error, reported by the next `finish`.
    device_error: Arc<Mutex<Option<String>>>,
}

impl WgpuBackend {
    /// Select a high-performance adapter and build the update pipeline.
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| {
                CellSimError::BackendUnavailable("No WebGPU adapter found".to_string())
            })?;

        let info = adapter.get_info();
        tracing::info!("WGPU cell backend: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("CellSim WGPU Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| CellSimError::device(format!("Failed to create device: {}", e)))?;

        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let device_error = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&device_error);
        device.on_uncaptured_error(Box::new(move |e| {
            tracing::error!("WGPU device error: {}", e);
            *slot.lock() = Some(e.to_string());
        }));

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cell Update Shader"),
            source: wgpu::ShaderSource::Wgsl(CELL_UPDATE_WGSL.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Cell Update Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cell Update Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Cell Update Pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: CELL_UPDATE_ENTRY,
        });

        if let Some(err) = device.pop_error_scope().await {
            return Err(CellSimError::KernelBuild(err.to_string()));
        }

        let limits = device.limits();
        tracing::debug!(
            max_workgroups = limits.max_compute_workgroups_per_dimension,
            max_binding = limits.max_storage_buffer_binding_size,
            "Cell update pipeline ready"
        );

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            limits,
            adapter_name: info.name,
            device_error,
        })
    }

    /// Get the device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Name of the selected adapter.
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Work-group grid for `groups` work-groups.
    ///
    /// Falls back to two dimensions when one exceeds the device limit; the
    /// shader folds `gid.y` back into a flat lane index.
    fn dispatch_size(&self, groups: u32) -> Result<(u32, u32)> {
        let max = self.limits.max_compute_workgroups_per_dimension;
        if groups <= max {
            return Ok((groups, 1));
        }
        let rows = groups.div_ceil(max);
        if rows > max {
            return Err(CellSimError::dispatch(format!(
                "{} work-groups exceed the device limit of {} per dimension",
                groups, max
            )));
        }
        Ok((max, rows))
    }

    fn take_device_error(&self) -> Option<String> {
        self.device_error.lock().take()
    }
}

impl KernelBackend for WgpuBackend {
    type Buffer = WgpuBuffer;

    fn name(&self) -> &str {
        "wgpu"
    }

    fn create_buffers(&self, len: usize) -> Result<DeviceBuffers<Self::Buffer>> {
        let size = len * std::mem::size_of::<u32>();
        if size == 0 {
            return Err(CellSimError::device("cannot allocate empty cell buffers"));
        }
        if size as u64 > u64::from(self.limits.max_storage_buffer_binding_size) {
            return Err(CellSimError::device(format!(
                "{} byte cell buffer exceeds storage binding limit of {}",
                size, self.limits.max_storage_buffer_binding_size
            )));
        }

        Ok(DeviceBuffers {
            read: WgpuBuffer::new(&self.device, size, "Cells Read"),
            write: WgpuBuffer::new(&self.device, size, "Cells Write"),
            len,
        })
    }

    fn upload(&self, buffers: &DeviceBuffers<Self::Buffer>, codes: &[u32]) -> Result<()> {
        if codes.len() != buffers.len {
            return Err(CellSimError::transfer(format!(
                "upload of {} cells into {}-cell buffers",
                codes.len(),
                buffers.len
            )));
        }
        let bytes: &[u8] = bytemuck::cast_slice(codes);
        self.queue.write_buffer(buffers.read.buffer(), 0, bytes);
        self.queue.write_buffer(buffers.write.buffer(), 0, bytes);
        Ok(())
    }

    fn dispatch(&self, buffers: &DeviceBuffers<Self::Buffer>, params: &KernelParams) -> Result<()> {
        if params.cell_count() != buffers.len {
            return Err(CellSimError::dispatch(format!(
                "kernel over {}x{} cells with {}-cell buffers",
                params.width, params.height, buffers.len
            )));
        }
        let (groups_x, groups_y) = self.dispatch_size(params.workgroups())?;

        let gpu_params = WgpuKernelParams {
            width: params.width,
            height: params.height,
            _pad0: 0,
            _pad1: 0,
        };

        let params_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Cell Update Params"),
                contents: bytemuck::bytes_of(&gpu_params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Cell Update Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.read.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.write.buffer().as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Cell Update Encoder"),
            });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Cell Update Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        self.device.poll(wgpu::Maintain::Wait);
        match self.take_device_error() {
            Some(err) => Err(CellSimError::dispatch(err)),
            None => Ok(()),
        }
    }

    fn read_back(&self, buffers: &DeviceBuffers<Self::Buffer>, out: &mut [u32]) -> Result<()> {
        if out.len() != buffers.len {
            return Err(CellSimError::transfer(format!(
                "readback of {} cells into {}-cell host buffer",
                buffers.len,
                out.len()
            )));
        }
        let size = buffers.write.size() as u64;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Cells Staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Cells Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(buffers.write.buffer(), 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| CellSimError::transfer("Map callback dropped"))?
            .map_err(|e| CellSimError::transfer(format!("Map failed: {:?}", e)))?;

        {
            let data = buffer_slice.get_mapped_range();
            out.copy_from_slice(bytemuck::cast_slice::<u8, u32>(&data));
        }
        staging.unmap();

        if let Some(err) = self.take_device_error() {
            return Err(CellSimError::transfer(err));
        }
        Ok(())
    }
}
