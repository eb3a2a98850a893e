//! Grid store for the cell simulation.
//!
//! Cells are stored as a flat buffer of atomic bytes indexed `x * height + y`,
//! the same flattening the device kernel uses, so upload and readback are
//! linear copies.
//!
//! Host schedulers share one `CellGrid` between workers and update it in
//! place. Every access is a relaxed atomic load or store: a worker may see a
//! neighbour that another worker already changed during the same tick. The
//! tick barrier (join, rayon return, device finish) publishes all writes
//! before the next tick or the renderer reads the grid.

use std::sync::atomic::{AtomicU8, Ordering};

use super::cell::{CellState, StateCounts};
use crate::error::{CellSimError, Result};

/// Read-only neighbour query used by the rule evaluator.
///
/// Implemented by the live grid, by immutable generation snapshots and by
/// encoded device buffers, so one rule serves every execution strategy.
pub trait CellSource: Sync {
    /// Grid width (number of columns).
    fn width(&self) -> usize;
    /// Grid height (number of rows).
    fn height(&self) -> usize;
    /// State at `(x, y)`. Callers guarantee the coordinate is in bounds.
    fn state(&self, x: usize, y: usize) -> CellState;
}

/// The simulation grid: a fixed-size `width x height` array of cell states.
pub struct CellGrid {
    width: usize,
    height: usize,
    cells: Box<[AtomicU8]>,
}

impl CellGrid {
    /// Create a grid with every cell Healthy.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CellSimError::config(format!(
                "grid dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        let count = width.checked_mul(height).ok_or_else(|| {
            CellSimError::config(format!("grid of {}x{} cells overflows", width, height))
        })?;
        let cells = (0..count)
            .map(|_| AtomicU8::new(CellState::Healthy as u8))
            .collect();
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Grid width.
    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height.
    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// True if `(x, y)` lies inside the grid.
    #[inline(always)]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Flat index of `(x, y)`.
    #[inline(always)]
    pub fn index(&self, x: usize, y: usize) -> usize {
        x * self.height + y
    }

    /// Coordinates of a flat index.
    #[inline(always)]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index / self.height, index % self.height)
    }

    fn check(&self, x: usize, y: usize) -> Result<()> {
        if self.contains(x, y) {
            Ok(())
        } else {
            Err(CellSimError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// State at `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Result<CellState> {
        self.check(x, y)?;
        Ok(self.load(self.index(x, y)))
    }

    /// Set the state at `(x, y)`.
    pub fn set(&self, x: usize, y: usize, state: CellState) -> Result<()> {
        self.check(x, y)?;
        self.store(self.index(x, y), state);
        Ok(())
    }

    /// Load by flat index (index must be in range).
    #[inline(always)]
    pub(crate) fn load(&self, index: usize) -> CellState {
        CellState::from_byte(self.cells[index].load(Ordering::Relaxed))
    }

    /// Store by flat index (index must be in range).
    #[inline(always)]
    pub(crate) fn store(&self, index: usize, state: CellState) {
        self.cells[index].store(state as u8, Ordering::Relaxed);
    }

    /// Atomically replace `from` with `to`; returns true if this call made the change.
    #[inline(always)]
    pub(crate) fn replace(&self, index: usize, from: CellState, to: CellState) -> bool {
        self.cells[index]
            .compare_exchange(from as u8, to as u8, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }

    /// Set every cell to `state`.
    pub fn fill(&self, state: CellState) {
        for cell in self.cells.iter() {
            cell.store(state as u8, Ordering::Relaxed);
        }
    }

    /// Count the cells in each state.
    pub fn counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for cell in self.cells.iter() {
            counts.add(CellState::from_byte(cell.load(Ordering::Relaxed)));
        }
        counts
    }

    /// Copy the current generation into an immutable snapshot.
    pub fn snapshot(&self) -> Generation {
        Generation {
            width: self.width,
            height: self.height,
            cells: (0..self.cells.len()).map(|i| self.load(i)).collect(),
        }
    }

    /// Write integer state codes into `out` (one `u32` per cell).
    pub fn encode_into(&self, out: &mut [u32]) -> Result<()> {
        if out.len() != self.cells.len() {
            return Err(CellSimError::transfer(format!(
                "encode buffer holds {} cells, grid has {}",
                out.len(),
                self.cells.len()
            )));
        }
        for (slot, cell) in out.iter_mut().zip(self.cells.iter()) {
            *slot = u32::from(cell.load(Ordering::Relaxed));
        }
        Ok(())
    }

    /// Encode the grid into a new vector of state codes.
    pub fn encode(&self) -> Vec<u32> {
        self.cells
            .iter()
            .map(|cell| u32::from(cell.load(Ordering::Relaxed)))
            .collect()
    }

    /// Overwrite the grid from integer state codes.
    ///
    /// Validates every code before writing, so a bad buffer leaves the grid untouched.
    pub fn load_encoded(&self, codes: &[u32]) -> Result<()> {
        if codes.len() != self.cells.len() {
            return Err(CellSimError::transfer(format!(
                "readback holds {} cells, grid has {}",
                codes.len(),
                self.cells.len()
            )));
        }
        if let Some((index, &code)) = codes
            .iter()
            .enumerate()
            .find(|(_, code)| CellState::from_code(**code).is_none())
        {
            return Err(CellSimError::InvalidStateCode { code, index });
        }
        for (cell, &code) in self.cells.iter().zip(codes) {
            cell.store(code as u8, Ordering::Relaxed);
        }
        Ok(())
    }
}

impl CellSource for CellGrid {
    #[inline(always)]
    fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    fn state(&self, x: usize, y: usize) -> CellState {
        self.load(self.index(x, y))
    }
}

impl std::fmt::Debug for CellGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("counts", &self.counts())
            .finish()
    }
}

/// Immutable copy of one generation of the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    width: usize,
    height: usize,
    cells: Vec<CellState>,
}

impl Generation {
    /// Flat cell states (same indexing as the grid).
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// State at `(x, y)`, or `None` if out of bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<CellState> {
        (x < self.width && y < self.height).then(|| self.cells[x * self.height + y])
    }
}

impl CellSource for Generation {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    fn state(&self, x: usize, y: usize) -> CellState {
        self.cells[x * self.height + y]
    }
}

/// Encoded device-style buffer viewed as a grid.
pub struct EncodedView<'a> {
    pub width: usize,
    pub height: usize,
    pub codes: &'a [u32],
}

impl CellSource for EncodedView<'_> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    fn state(&self, x: usize, y: usize) -> CellState {
        CellState::from_byte(self.codes[x * self.height + y] as u8)
    }
}
