//! Device backends for kernel offload.
//!
//! A backend holds two flat buffers of encoded cell states in column-major
//! order (`i = x * height + y`). One tick is:
//!
//! ```text
//! host grid --encode--> upload(read, write) --dispatch--> finish --read_back(write)--> host grid
//! ```
//!
//! The kernel reads neighbours only from the read buffer and writes only the
//! write buffer, so every lane sees the previous generation no matter the
//! execution order. Lanes cannot run flood propagation; the offload
//! scheduler cascades heals on the host after readback.

use crate::error::Result;

mod emulated;
pub mod shader;

#[cfg(feature = "wgpu")]
mod wgpu_backend;

pub use emulated::{EmulatedBackend, LaneOrder};

#[cfg(feature = "wgpu")]
pub use wgpu_backend::{WgpuBackend, WgpuBuffer};

/// Work-group width used by device kernels.
pub const WORKGROUP_SIZE: u32 = 256;

/// Grid dimensions passed to the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelParams {
    /// Grid width (columns).
    pub width: u32,
    /// Grid height (rows).
    pub height: u32,
}

impl KernelParams {
    /// Create kernel parameters.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of cells (kernel lanes).
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Work-groups needed to cover every cell.
    pub fn workgroups(&self) -> u32 {
        let cells = self.width * self.height;
        cells.div_ceil(WORKGROUP_SIZE)
    }
}

/// Backend for running the transition kernel over a flattened grid.
pub trait KernelBackend: Send + Sync {
    /// Device buffer type for this backend.
    type Buffer: Send + Sync;

    /// Short name for logs.
    fn name(&self) -> &str;

    /// Allocate read and write buffers for `len` cells.
    fn create_buffers(&self, len: usize) -> Result<DeviceBuffers<Self::Buffer>>;

    /// Copy the current generation into both buffers.
    ///
    /// Initialising the write buffer too means lanes that keep their state
    /// need not write at all.
    fn upload(&self, buffers: &DeviceBuffers<Self::Buffer>, codes: &[u32]) -> Result<()>;

    /// Enqueue one kernel execution over every cell.
    fn dispatch(&self, buffers: &DeviceBuffers<Self::Buffer>, params: &KernelParams) -> Result<()>;

    /// Block until all enqueued work has completed.
    fn finish(&self) -> Result<()>;

    /// Copy the write buffer back into `out`.
    fn read_back(&self, buffers: &DeviceBuffers<Self::Buffer>, out: &mut [u32]) -> Result<()>;
}

/// Read and write buffers for one grid.
///
/// Generic over the backend's buffer type.
pub struct DeviceBuffers<B> {
    /// Previous generation; the kernel only reads it.
    pub read: B,
    /// Next generation; the kernel only writes it.
    pub write: B,
    /// Number of cells in each buffer.
    pub len: usize,
}

impl<B> DeviceBuffers<B> {
    /// Size of each buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.len * std::mem::size_of::<u32>()
    }
}
