//! Random initial placement of Cancer cells.

use rand::Rng;

use super::cell::CellState;
use super::grid::CellGrid;
use crate::error::{CellSimError, Result};

/// Default minimum fraction of the grid seeded as Cancer.
pub const DEFAULT_CANCER_FRACTION: f64 = 0.26;

/// Number of Cancer cells the seeder places for `fraction` of `cell_count` cells.
///
/// The placement loop runs from zero up to and including the truncated
/// target, so one cell more than the target is converted (capped at the grid size).
pub fn seed_target(cell_count: usize, fraction: f64) -> usize {
    let target = (cell_count as f64 * fraction) as usize;
    (target + 1).min(cell_count)
}

/// Reset the grid to Healthy and convert at least `min_fraction` of it to Cancer.
///
/// Coordinates are drawn uniformly; drawing a cell that is already Cancer
/// does not count toward progress. Returns the number of Cancer cells placed.
pub fn seed<R: Rng + ?Sized>(grid: &CellGrid, min_fraction: f64, rng: &mut R) -> Result<usize> {
    if !(0.0..=1.0).contains(&min_fraction) {
        return Err(CellSimError::config(format!(
            "initial cancer fraction must be within [0, 1], got {}",
            min_fraction
        )));
    }

    grid.fill(CellState::Healthy);
    if min_fraction == 0.0 {
        return Ok(0);
    }

    let width = grid.width();
    let height = grid.height();
    let target = seed_target(grid.cell_count(), min_fraction);

    let mut placed = 0;
    while placed < target {
        let x = rng.gen_range(0..width);
        let y = rng.gen_range(0..height);
        let idx = grid.index(x, y);
        if grid.load(idx) != CellState::Cancer {
            grid.store(idx, CellState::Cancer);
            placed += 1;
        }
    }

    tracing::debug!(placed, target, "Seeded cancer cells");
    Ok(placed)
}
