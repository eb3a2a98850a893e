//! Host emulation of the cell update kernel.
//!
//! Runs one lane per cell over two separate host buffers exactly as the
//! device kernel does: neighbours come from the read buffer, transitions go
//! to the write buffer, and lanes never cascade. Always available, which
//! makes it the backend offload tests run against.

use parking_lot::RwLock;
use rayon::prelude::*;

use super::{DeviceBuffers, KernelBackend, KernelParams};
use crate::error::{CellSimError, Result};
use crate::simulation::{evaluate_state, CellState, EncodedView, Transition};

/// Order in which emulated lanes execute.
///
/// The result never depends on it; the non-parallel orders exist so tests
/// can check that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaneOrder {
    /// Lanes run on the rayon pool in unspecified order.
    #[default]
    Parallel,
    /// Lanes run one after another from index 0.
    Forward,
    /// Lanes run one after another from the last index.
    Reverse,
}

/// Kernel backend executing lanes on the host.
#[derive(Debug, Clone, Default)]
pub struct EmulatedBackend {
    order: LaneOrder,
}

impl EmulatedBackend {
    /// Create an emulated backend running lanes in parallel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an emulated backend with an explicit lane order.
    pub fn with_order(order: LaneOrder) -> Self {
        Self { order }
    }

    /// The lane order.
    pub fn order(&self) -> LaneOrder {
        self.order
    }
}

/// One kernel lane: evaluate cell `i` from `view` and write any transition.
#[inline]
fn run_lane(view: &EncodedView<'_>, i: usize, out: &mut u32) {
    let Some(current) = CellState::from_code(view.codes[i]) else {
        return;
    };
    let x = i / view.height;
    let y = i % view.height;
    match evaluate_state(view, x, y, current) {
        Transition::Stay => {}
        transition => *out = transition.apply_to(current).code(),
    }
}

impl KernelBackend for EmulatedBackend {
    type Buffer = RwLock<Vec<u32>>;

    fn name(&self) -> &str {
        "emulated"
    }

    fn create_buffers(&self, len: usize) -> Result<DeviceBuffers<Self::Buffer>> {
        if len == 0 {
            return Err(CellSimError::device("cannot allocate empty cell buffers"));
        }
        Ok(DeviceBuffers {
            read: RwLock::new(vec![0; len]),
            write: RwLock::new(vec![0; len]),
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
        buffers.read.write().copy_from_slice(codes);
        buffers.write.write().copy_from_slice(codes);
        Ok(())
    }

    fn dispatch(&self, buffers: &DeviceBuffers<Self::Buffer>, params: &KernelParams) -> Result<()> {
        if params.cell_count() != buffers.len {
            return Err(CellSimError::dispatch(format!(
                "kernel over {}x{} cells with {}-cell buffers",
                params.width, params.height, buffers.len
            )));
        }

        let read = buffers.read.read();
        let mut write = buffers.write.write();
        let view = EncodedView {
            width: params.width as usize,
            height: params.height as usize,
            codes: &read,
        };

        match self.order {
            LaneOrder::Parallel => write
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, out)| run_lane(&view, i, out)),
            LaneOrder::Forward => {
                for (i, out) in write.iter_mut().enumerate() {
                    run_lane(&view, i, out);
                }
            }
            LaneOrder::Reverse => {
                for (i, out) in write.iter_mut().enumerate().rev() {
                    run_lane(&view, i, out);
                }
            }
        }
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        // Dispatch is synchronous.
        Ok(())
    }

    fn read_back(&self, buffers: &DeviceBuffers<Self::Buffer>, out: &mut [u32]) -> Result<()> {
        let write = buffers.write.read();
        if out.len() != write.len() {
            return Err(CellSimError::transfer(format!(
                "readback of {} cells into {}-cell host buffer",
                write.len(),
                out.len()
            )));
        }
        out.copy_from_slice(&write);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::CellGrid;

    fn run_once(backend: &EmulatedBackend, grid: &CellGrid) -> Vec<u32> {
        let params = KernelParams::new(grid.width() as u32, grid.height() as u32);
        let buffers = backend.create_buffers(grid.cell_count()).unwrap();
        backend.upload(&buffers, &grid.encode()).unwrap();
        backend.dispatch(&buffers, &params).unwrap();
        backend.finish().unwrap();
        let mut out = vec![0; grid.cell_count()];
        backend.read_back(&buffers, &mut out).unwrap();
        out
    }

    #[test]
    fn test_heal_writes_healthy_without_cascade() {
        let grid = CellGrid::new(5, 5).unwrap();
        grid.fill(CellState::Medicine);
        grid.set(2, 2, CellState::Cancer).unwrap();

        let out = run_once(&EmulatedBackend::new(), &grid);

        assert_eq!(out[grid.index(2, 2)], CellState::Healthy.code());
        assert_eq!(
            out.iter().filter(|&&c| c == CellState::Medicine.code()).count(),
            24
        );
    }

    #[test]
    fn test_lanes_read_previous_generation() {
        // (1, 2) is infected this tick; (2, 2) would reach the threshold only
        // if it saw that write.
        let grid = CellGrid::new(5, 5).unwrap();
        for (x, y) in [(0, 1), (0, 2), (0, 3), (1, 1), (1, 3), (2, 1), (2, 3), (3, 1)] {
            grid.set(x, y, CellState::Cancer).unwrap();
        }
        for order in [LaneOrder::Forward, LaneOrder::Reverse, LaneOrder::Parallel] {
            let out = run_once(&EmulatedBackend::with_order(order), &grid);
            assert_eq!(out[grid.index(1, 2)], CellState::Cancer.code(), "{:?}", order);
            assert_eq!(out[grid.index(2, 2)], CellState::Healthy.code(), "{:?}", order);
        }
    }

    #[test]
    fn test_lane_order_does_not_change_result() {
        let grid = CellGrid::new(16, 12).unwrap();
        for i in 0..grid.cell_count() {
            let (x, y) = grid.coords(i);
            let state = match (x * 7 + y * 3) % 5 {
                0 | 1 | 2 => CellState::Cancer,
                3 => CellState::Medicine,
                _ => CellState::Healthy,
            };
            grid.set(x, y, state).unwrap();
        }

        let forward = run_once(&EmulatedBackend::with_order(LaneOrder::Forward), &grid);
        let reverse = run_once(&EmulatedBackend::with_order(LaneOrder::Reverse), &grid);
        let parallel = run_once(&EmulatedBackend::new(), &grid);
        assert_eq!(forward, reverse);
        assert_eq!(forward, parallel);
    }

    #[test]
    fn test_size_mismatch_errors() {
        let backend = EmulatedBackend::new();
        let buffers = backend.create_buffers(10).unwrap();
        assert!(backend.upload(&buffers, &[0; 9]).is_err());
        assert!(backend.dispatch(&buffers, &KernelParams::new(3, 3)).is_err());
        let mut out = vec![0; 11];
        assert!(backend.read_back(&buffers, &mut out).is_err());
        assert!(backend.create_buffers(0).is_err());
    }
}
