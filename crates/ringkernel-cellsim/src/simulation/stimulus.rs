//! Medicine injection at a point.

use super::cell::{moore_neighbors, CellState};
use super::grid::CellGrid;
use crate::error::Result;

/// Result of a medicine injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StimulusOutcome {
    /// Injected into a Cancer cell: the medicine was absorbed and the cell healed.
    Absorbed,
    /// Medicine spread one ring outward; `cells` is the number of cells set to Medicine.
    Spread { cells: usize },
}

/// Inject medicine at `(x, y)`.
///
/// A Cancer target becomes Healthy and nothing else changes. Any other target
/// becomes Medicine along with every in-bounds Moore neighbour. The spread
/// does not recurse and does not trigger flood propagation.
///
/// Must only be called between ticks.
pub fn apply_stimulus(grid: &CellGrid, x: usize, y: usize) -> Result<StimulusOutcome> {
    if grid.get(x, y)? == CellState::Cancer {
        grid.set(x, y, CellState::Healthy)?;
        return Ok(StimulusOutcome::Absorbed);
    }

    grid.set(x, y, CellState::Medicine)?;
    let mut cells = 1;
    for (nx, ny) in moore_neighbors(x, y, grid.width(), grid.height()) {
        grid.store(grid.index(nx, ny), CellState::Medicine);
        cells += 1;
    }
    Ok(StimulusOutcome::Spread { cells })
}
