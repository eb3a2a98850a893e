//! Flood propagation ("medicine burst").
//!
//! Healing a Cancer cell converts it and the whole 8-connected Medicine
//! component it touches to Healthy. The traversal uses an explicit worklist,
//! so a large Medicine blob costs heap, not call stack.

use super::cell::{moore_neighbors, CellState};
use super::grid::CellGrid;

/// Heal `(x, y)` and every Medicine cell connected to it.
///
/// Medicine cells are claimed with a compare-exchange before they are queued,
/// so workers cascading into the same component concurrently heal each cell
/// exactly once between them. Returns the number of cells this call
/// converted, including `(x, y)` itself.
///
/// `(x, y)` must be inside the grid.
pub fn heal(grid: &CellGrid, x: usize, y: usize) -> usize {
    let width = grid.width();
    let height = grid.height();

    grid.store(grid.index(x, y), CellState::Healthy);
    let mut healed = 1;

    let mut pending = vec![(x, y)];
    while let Some((cx, cy)) = pending.pop() {
        for (nx, ny) in moore_neighbors(cx, cy, width, height) {
            if grid.replace(grid.index(nx, ny), CellState::Medicine, CellState::Healthy) {
                healed += 1;
                pending.push((nx, ny));
            }
        }
    }

    healed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paint(grid: &CellGrid, x0: usize, y0: usize, size: usize, state: CellState) {
        for x in x0..x0 + size {
            for y in y0..y0 + size {
                grid.set(x, y, state).unwrap();
            }
        }
    }

    #[test]
    fn test_heal_block_touching_corner() {
        let grid = CellGrid::new(12, 12).unwrap();
        paint(&grid, 3, 3, 5, CellState::Medicine);
        grid.set(2, 2, CellState::Cancer).unwrap();

        let healed = heal(&grid, 2, 2);

        assert_eq!(healed, 26);
        assert_eq!(grid.counts().healthy, 144);
    }

    #[test]
    fn test_heal_leaves_disconnected_medicine() {
        let grid = CellGrid::new(12, 12).unwrap();
        paint(&grid, 1, 1, 3, CellState::Medicine);
        paint(&grid, 8, 8, 2, CellState::Medicine);
        grid.set(0, 0, CellState::Cancer).unwrap();

        heal(&grid, 0, 0);

        assert_eq!(grid.counts().medicine, 4);
        assert_eq!(grid.get(8, 8).unwrap(), CellState::Medicine);
        assert_eq!(grid.get(2, 2).unwrap(), CellState::Healthy);
    }

    #[test]
    fn test_heal_follows_diagonal_links() {
        let grid = CellGrid::new(6, 6).unwrap();
        for i in 1..6 {
            grid.set(i, i, CellState::Medicine).unwrap();
        }
        grid.set(0, 0, CellState::Cancer).unwrap();

        assert_eq!(heal(&grid, 0, 0), 6);
        assert_eq!(grid.counts().medicine, 0);
    }

    #[test]
    fn test_heal_does_not_touch_cancer() {
        let grid = CellGrid::new(4, 4).unwrap();
        grid.set(1, 1, CellState::Cancer).unwrap();
        grid.set(2, 2, CellState::Cancer).unwrap();
        grid.set(1, 2, CellState::Medicine).unwrap();

        heal(&grid, 1, 1);

        assert_eq!(grid.get(2, 2).unwrap(), CellState::Cancer);
        assert_eq!(grid.get(1, 2).unwrap(), CellState::Healthy);
    }

    #[test]
    fn test_heal_large_region_without_recursion() {
        let grid = CellGrid::new(1024, 768).unwrap();
        grid.fill(CellState::Medicine);
        grid.set(0, 0, CellState::Cancer).unwrap();

        assert_eq!(heal(&grid, 0, 0), 1024 * 768);
        assert_eq!(grid.counts().healthy, 1024 * 768);
    }
}
