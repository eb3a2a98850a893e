//! Work-stealing 2D range scheduler.
//!
//! The grid is treated as a 2D range that rayon recursively halves along its
//! longer side until a sub-range is no larger than the grain. Leaves are
//! evaluated by whichever pool thread picks them up, so load imbalance from
//! expensive floods is absorbed by stealing.

use std::time::Instant;

use rayon::ThreadPool;

use super::{evaluate_region, snapshot_for, Consistency, Region, Scheduler, TickStats};
use crate::error::{CellSimError, Result};
use crate::simulation::{CellGrid, Generation};

/// Smallest automatic grain (cells along one side of a leaf).
const MIN_AUTO_GRAIN: usize = 16;

/// Leaves per pool thread targeted by the automatic grain.
const LEAVES_PER_THREAD: usize = 8;

/// Tuning for [`Range2dScheduler`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeConfig {
    /// Maximum side length of a leaf range; `None` picks one from the grid size.
    pub grain: Option<usize>,
    /// Dedicated pool size; `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

impl RangeConfig {
    /// Set the leaf grain.
    pub fn with_grain(mut self, grain: usize) -> Self {
        self.grain = Some(grain);
        self
    }

    /// Run on a dedicated pool with `threads` workers.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}

/// Recursive range splitting on a rayon pool.
#[derive(Debug)]
pub struct Range2dScheduler {
    config: RangeConfig,
    pool: Option<ThreadPool>,
    consistency: Consistency,
}

impl Range2dScheduler {
    /// Create a scheduler, building a dedicated pool if `config.threads` is set.
    pub fn new(config: RangeConfig, consistency: Consistency) -> Result<Self> {
        if config.grain == Some(0) {
            return Err(CellSimError::config("range grain must be non-zero"));
        }
        let pool = match config.threads {
            Some(0) => return Err(CellSimError::config("thread count must be non-zero")),
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("cellsim-range-{}", i))
                    .build()
                    .map_err(|e| CellSimError::Worker(e.to_string()))?,
            ),
            None => None,
        };
        Ok(Self {
            config,
            pool,
            consistency,
        })
    }

    /// Number of threads ranges are distributed over.
    pub fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Leaf side length used for a `width x height` grid.
    pub fn grain_for(&self, width: usize, height: usize) -> usize {
        match self.config.grain {
            Some(grain) => grain,
            None => {
                let leaves = (self.threads() * LEAVES_PER_THREAD).max(1);
                let side = ((width * height / leaves) as f64).sqrt() as usize;
                side.max(MIN_AUTO_GRAIN)
            }
        }
    }
}

fn evaluate_range(
    grid: &CellGrid,
    snapshot: Option<&Generation>,
    region: Region,
    grain: usize,
) -> TickStats {
    match region.split(grain) {
        Some((left, right)) => {
            let (a, b) = rayon::join(
                || evaluate_range(grid, snapshot, left, grain),
                || evaluate_range(grid, snapshot, right, grain),
            );
            a.merge(b)
        }
        None => evaluate_region(grid, snapshot, region),
    }
}

impl Scheduler for Range2dScheduler {
    fn name(&self) -> &'static str {
        "range2d"
    }

    fn consistency(&self) -> Consistency {
        self.consistency
    }

    fn run_tick(&mut self, grid: &CellGrid) -> Result<TickStats> {
        let start = Instant::now();
        let grain = self.grain_for(grid.width(), grid.height());
        let snapshot = snapshot_for(grid, self.consistency);
        let snapshot = snapshot.as_ref();
        let region = Region::full(grid);

        let mut stats = match &self.pool {
            Some(pool) => pool.install(|| evaluate_range(grid, snapshot, region, grain)),
            None => evaluate_range(grid, snapshot, region, grain),
        };

        stats.elapsed = start.elapsed();
        tracing::trace!(
            grain,
            leaves = stats.partitions,
            changed = stats.changed(),
            "Range tick complete"
        );
        Ok(stats)
    }
}
