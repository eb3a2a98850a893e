//! Single-threaded reference scheduler.

use std::time::Instant;

use super::{evaluate_region, snapshot_for, Consistency, Region, Scheduler, TickStats};
use crate::error::Result;
use crate::simulation::CellGrid;

/// Evaluates the whole grid as one partition on the calling thread.
///
/// Columns are visited left to right, rows top to bottom, so in-place runs
/// are deterministic for a given starting grid.
#[derive(Debug, Clone, Default)]
pub struct SequentialScheduler {
    consistency: Consistency,
}

impl SequentialScheduler {
    /// Create a sequential scheduler.
    pub fn new(consistency: Consistency) -> Self {
        Self { consistency }
    }
}

impl Scheduler for SequentialScheduler {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn consistency(&self) -> Consistency {
        self.consistency
    }

    fn run_tick(&mut self, grid: &CellGrid) -> Result<TickStats> {
        let start = Instant::now();
        let snapshot = snapshot_for(grid, self.consistency);
        let mut stats = evaluate_region(grid, snapshot.as_ref(), Region::full(grid));
        stats.elapsed = start.elapsed();
        Ok(stats)
    }
}
