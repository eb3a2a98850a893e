//! Kernel offload scheduler.
//!
//! Each tick the live grid is encoded into a flat `u32` buffer, uploaded to
//! the backend's read and write buffers, evaluated by one kernel lane per
//! cell, and read back. Lanes only see the previous generation and cannot
//! run flood propagation, so the host cascades a flood from every cell that
//! went Cancer to Healthy once the readback has been applied.

use std::time::Instant;

use super::{check_dimensions, Consistency, Scheduler, TickStats};
use crate::compute::{DeviceBuffers, KernelBackend, KernelParams};
use crate::error::{CellSimError, Result};
use crate::simulation::{flood, CellGrid, CellState};

/// Runs ticks through a [`KernelBackend`].
pub struct OffloadScheduler<B: KernelBackend> {
    backend: B,
    buffers: DeviceBuffers<B::Buffer>,
    params: KernelParams,
    current: Vec<u32>,
    next: Vec<u32>,
}

impl<B: KernelBackend> OffloadScheduler<B> {
    /// Allocate device buffers for a `width x height` grid.
    pub fn new(backend: B, width: usize, height: usize) -> Result<Self> {
        let (w, h) = match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 && w.checked_mul(h).is_some() => (w, h),
            _ => {
                return Err(CellSimError::config(format!(
                    "{}x{} grid cannot be indexed by a device kernel",
                    width, height
                )))
            }
        };
        let params = KernelParams::new(w, h);
        let len = params.cell_count();
        let buffers = backend.create_buffers(len)?;

        tracing::info!(
            backend = backend.name(),
            width,
            height,
            bytes = buffers.byte_size() * 2,
            "Allocated device cell buffers"
        );

        Ok(Self {
            backend,
            buffers,
            params,
            current: vec![0; len],
            next: vec![0; len],
        })
    }

    /// The device backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Kernel parameters for the grid.
    pub fn params(&self) -> KernelParams {
        self.params
    }
}

impl<B: KernelBackend> Scheduler for OffloadScheduler<B> {
    fn name(&self) -> &'static str {
        "offload"
    }

    fn consistency(&self) -> Consistency {
        Consistency::Generational
    }

    fn run_tick(&mut self, grid: &CellGrid) -> Result<TickStats> {
        let start = Instant::now();
        check_dimensions(
            grid,
            self.params.width as usize,
            self.params.height as usize,
        )?;

        grid.encode_into(&mut self.current)?;
        self.backend.upload(&self.buffers, &self.current)?;
        self.backend.dispatch(&self.buffers, &self.params)?;
        self.backend.finish()?;
        self.backend.read_back(&self.buffers, &mut self.next)?;
        grid.load_encoded(&self.next)?;

        let healthy = CellState::Healthy.code();
        let cancer = CellState::Cancer.code();
        let mut stats = TickStats {
            evaluated: self.params.cell_count(),
            partitions: self.params.workgroups() as usize,
            ..Default::default()
        };
        for (i, (&before, &after)) in self.current.iter().zip(&self.next).enumerate() {
            if before == healthy && after == cancer {
                stats.infected += 1;
            } else if before == cancer && after == healthy {
                let (x, y) = grid.coords(i);
                stats.healed += 1;
                stats.cascaded += flood::heal(grid, x, y) - 1;
            }
        }

        stats.elapsed = start.elapsed();
        tracing::trace!(
            backend = self.backend.name(),
            changed = stats.changed(),
            "Offload tick complete"
        );
        Ok(stats)
    }
}

impl<B: KernelBackend> Drop for OffloadScheduler<B> {
    fn drop(&mut self) {
        tracing::debug!(
            backend = self.backend.name(),
            cells = self.buffers.len,
            "Releasing device cell buffers"
        );
    }
}
