//! Fixed-partition thread scheduler.
//!
//! The grid is cut into a static `columns x rows` layout once per tick and
//! every partition gets its own scoped OS thread. The tick ends when all
//! threads have been joined.

use std::thread;
use std::time::Instant;

use super::{evaluate_region, snapshot_for, Consistency, Region, Scheduler, TickStats};
use crate::error::{CellSimError, Result};
use crate::simulation::CellGrid;

/// Static partition layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadrantLayout {
    /// Partitions along x.
    pub columns: usize,
    /// Partitions along y.
    pub rows: usize,
}

impl Default for QuadrantLayout {
    fn default() -> Self {
        Self::new(2, 2)
    }
}

impl QuadrantLayout {
    /// Create a layout with `columns x rows` partitions.
    pub fn new(columns: usize, rows: usize) -> Self {
        Self { columns, rows }
    }

    /// Total number of partitions.
    pub fn count(&self) -> usize {
        self.columns * self.rows
    }

    /// Split a `width x height` grid into disjoint regions covering every cell.
    ///
    /// Boundaries fall at `i * width / columns` and `j * height / rows`, so
    /// partition sizes differ by at most one column or row.
    pub fn partitions(&self, width: usize, height: usize) -> Result<Vec<Region>> {
        if self.columns == 0 || self.rows == 0 {
            return Err(CellSimError::config(format!(
                "partition layout must be non-zero, got {}x{}",
                self.columns, self.rows
            )));
        }
        if self.columns > width || self.rows > height {
            return Err(CellSimError::config(format!(
                "{}x{} partitions do not fit a {}x{} grid",
                self.columns, self.rows, width, height
            )));
        }

        let mut regions = Vec::with_capacity(self.count());
        for i in 0..self.columns {
            for j in 0..self.rows {
                regions.push(Region {
                    x0: i * width / self.columns,
                    x1: (i + 1) * width / self.columns,
                    y0: j * height / self.rows,
                    y1: (j + 1) * height / self.rows,
                });
            }
        }
        Ok(regions)
    }
}

impl std::str::FromStr for QuadrantLayout {
    type Err = CellSimError;

    /// Parse `"<columns>x<rows>"`, e.g. `"2x2"`.
    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| CellSimError::config(format!("invalid partition layout '{}'", s)))
        };
        match s.split_once(['x', 'X']) {
            Some((columns, rows)) => Ok(Self::new(parse(columns)?, parse(rows)?)),
            None => Err(CellSimError::config(format!(
                "partition layout must look like 2x2, got '{}'",
                s
            ))),
        }
    }
}

/// One scoped thread per static partition.
#[derive(Debug, Clone)]
pub struct QuadrantScheduler {
    layout: QuadrantLayout,
    consistency: Consistency,
}

impl QuadrantScheduler {
    /// Create a scheduler for `layout`.
    pub fn new(layout: QuadrantLayout, consistency: Consistency) -> Result<Self> {
        if layout.count() == 0 {
            return Err(CellSimError::config(format!(
                "partition layout must be non-zero, got {}x{}",
                layout.columns, layout.rows
            )));
        }
        Ok(Self {
            layout,
            consistency,
        })
    }

    /// The partition layout.
    pub fn layout(&self) -> QuadrantLayout {
        self.layout
    }
}

impl Scheduler for QuadrantScheduler {
    fn name(&self) -> &'static str {
        "quadrant"
    }

    fn consistency(&self) -> Consistency {
        self.consistency
    }

    fn run_tick(&mut self, grid: &CellGrid) -> Result<TickStats> {
        let start = Instant::now();
        let regions = self.layout.partitions(grid.width(), grid.height())?;
        let snapshot = snapshot_for(grid, self.consistency);
        let snapshot = snapshot.as_ref();

        let mut stats = thread::scope(|scope| -> Result<TickStats> {
            let mut handles = Vec::with_capacity(regions.len());
            for (i, region) in regions.iter().copied().enumerate() {
                let handle = thread::Builder::new()
                    .name(format!("cellsim-quadrant-{}", i))
                    .spawn_scoped(scope, move || evaluate_region(grid, snapshot, region))
                    .map_err(|e| CellSimError::Worker(format!("spawn partition {}: {}", i, e)))?;
                handles.push(handle);
            }

            let mut total = TickStats::default();
            for handle in handles {
                match handle.join() {
                    Ok(partial) => total = total.merge(partial),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            Ok(total)
        })?;

        stats.elapsed = start.elapsed();
        tracing::trace!(
            partitions = stats.partitions,
            changed = stats.changed(),
            "Quadrant tick complete"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SequentialScheduler;
    use crate::simulation::{seed, CellState};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_layout_is_quadrants() {
        let regions = QuadrantLayout::default().partitions(1024, 768).unwrap();
        assert_eq!(regions.len(), 4);
        assert_eq!((regions[0].x0, regions[0].x1), (0, 512));
        assert_eq!((regions[0].y0, regions[0].y1), (0, 384));
        assert_eq!((regions[3].x0, regions[3].x1), (512, 1024));
        assert_eq!((regions[3].y0, regions[3].y1), (384, 768));
    }

    #[test]
    fn test_partitions_cover_grid_once() {
        for (w, h) in [(7, 5), (10, 3), (1, 1), (33, 17)] {
            let layout = QuadrantLayout::new(w.min(3), h.min(2));
            let regions = layout.partitions(w, h).unwrap();
            let mut hits = vec![0u8; w * h];
            for region in &regions {
                for x in region.x0..region.x1 {
                    for y in region.y0..region.y1 {
                        hits[x * h + y] += 1;
                    }
                }
            }
            assert!(hits.iter().all(|&n| n == 1), "{}x{}", w, h);
        }
    }

    #[test]
    fn test_layout_errors() {
        assert!(QuadrantLayout::new(0, 2).partitions(8, 8).is_err());
        assert!(QuadrantLayout::new(9, 1).partitions(8, 8).is_err());
        assert!(QuadrantScheduler::new(QuadrantLayout::new(2, 0), Consistency::InPlace).is_err());
    }

    #[test]
    fn test_parse_layout() {
        assert_eq!("2x2".parse::<QuadrantLayout>().unwrap(), QuadrantLayout::new(2, 2));
        assert_eq!("4X1".parse::<QuadrantLayout>().unwrap(), QuadrantLayout::new(4, 1));
        assert!("4".parse::<QuadrantLayout>().is_err());
        assert!("ax2".parse::<QuadrantLayout>().is_err());
    }

    #[test]
    fn test_generational_matches_sequential() {
        let reference = CellGrid::new(64, 48).unwrap();
        seed(&reference, 0.45, &mut StdRng::seed_from_u64(11)).unwrap();
        let grid = CellGrid::new(64, 48).unwrap();
        grid.load_encoded(&reference.encode()).unwrap();

        let mut sequential = SequentialScheduler::new(Consistency::Generational);
        let mut quadrant =
            QuadrantScheduler::new(QuadrantLayout::new(3, 2), Consistency::Generational).unwrap();

        for _ in 0..5 {
            sequential.run_tick(&reference).unwrap();
            let stats = quadrant.run_tick(&grid).unwrap();
            assert_eq!(stats.partitions, 6);
            assert_eq!(stats.evaluated, 64 * 48);
        }
        assert_eq!(grid.snapshot(), reference.snapshot());
    }

    #[test]
    fn test_in_place_preserves_cell_count() {
        let grid = CellGrid::new(40, 30).unwrap();
        seed(&grid, 0.3, &mut StdRng::seed_from_u64(5)).unwrap();
        grid.set(20, 15, CellState::Medicine).unwrap();

        let mut scheduler = QuadrantScheduler::new(QuadrantLayout::default(), Consistency::InPlace).unwrap();
        for _ in 0..3 {
            scheduler.run_tick(&grid).unwrap();
        }
        assert_eq!(grid.counts().total(), 1200);
    }

    #[test]
    fn test_in_place_flood_converts_each_cell_once() {
        let triggers = [(31, 31), (32, 32), (10, 50), (50, 10), (31, 40), (40, 31)];
        for _ in 0..20 {
            let grid = CellGrid::new(64, 64).unwrap();
            grid.fill(CellState::Medicine);
            for &(x, y) in &triggers {
                grid.set(x, y, CellState::Cancer).unwrap();
            }

            let mut scheduler = QuadrantScheduler::new(QuadrantLayout::default(), Consistency::InPlace).unwrap();
            let stats = scheduler.run_tick(&grid).unwrap();

            let counts = grid.counts();
            assert!(stats.healed >= 1);
            assert_eq!(stats.infected, 0);
            assert_eq!(counts.medicine, 0);
            assert_eq!(counts.healthy, stats.healed + stats.cascaded);
            assert_eq!(counts.cancer, triggers.len() - stats.healed);
        }
    }
}
