//! Tick schedulers.
//!
//! Every scheduler evaluates the transition rule once for every cell per
//! tick and blocks until the whole grid is done. They differ only in how the
//! grid is partitioned and executed:
//!
//! ```text
//! Sequential   one partition, calling thread
//! Quadrant     static columns x rows partitions, one scoped thread each
//! Range2d      recursive 2D range splitting on the rayon work-stealing pool
//! Offload      flattened double buffer, evaluated per element by a KernelBackend
//! ```
//!
//! ## Consistency
//!
//! The host schedulers default to [`Consistency::InPlace`]: workers read and
//! write the live grid, so a cell may see a neighbour that was already
//! updated earlier in the same tick, and results depend on partitioning and
//! thread timing. This is the reference behaviour of the simulation.
//! [`Consistency::Generational`] makes them read from an
//! immutable snapshot of the previous generation instead, which is what the
//! offload scheduler always does.

use std::time::Duration;

use crate::error::{CellSimError, Result};
use crate::simulation::{evaluate_state, flood, CellGrid, CellSource, Generation, Transition};

mod offload;
mod quadrant;
mod range2d;
mod sequential;

pub use offload::OffloadScheduler;
pub use quadrant::{QuadrantLayout, QuadrantScheduler};
pub use range2d::{Range2dScheduler, RangeConfig};
pub use sequential::SequentialScheduler;

/// Which generation the rule reads neighbours from during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Consistency {
    /// Read and write the live grid; partitions may observe each other's writes.
    #[default]
    InPlace,
    /// Read the previous generation only; write the live grid.
    Generational,
}

/// Counters collected while running one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Cells the rule was evaluated for.
    pub evaluated: usize,
    /// Healthy cells that became Cancer.
    pub infected: usize,
    /// Cancer cells healed by the rule.
    pub healed: usize,
    /// Medicine cells converted by flood propagation.
    pub cascaded: usize,
    /// Partitions the grid was split into.
    pub partitions: usize,
    /// Wall-clock time of the tick.
    pub elapsed: Duration,
}

impl TickStats {
    /// Combine counters from two partitions.
    pub fn merge(mut self, other: TickStats) -> TickStats {
        self.evaluated += other.evaluated;
        self.infected += other.infected;
        self.healed += other.healed;
        self.cascaded += other.cascaded;
        self.partitions += other.partitions;
        self
    }

    /// Number of cells whose state changed.
    pub fn changed(&self) -> usize {
        self.infected + self.healed + self.cascaded
    }
}

/// A sub-region of the grid: columns `x0..x1`, rows `y0..y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x0: usize,
    pub x1: usize,
    pub y0: usize,
    pub y1: usize,
}

impl Region {
    /// The whole grid.
    pub fn full(grid: &CellGrid) -> Self {
        Self {
            x0: 0,
            x1: grid.width(),
            y0: 0,
            y1: grid.height(),
        }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.x1 - self.x0
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.y1 - self.y0
    }

    /// Number of cells.
    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    /// Split the larger side in half if it exceeds `grain`.
    pub fn split(&self, grain: usize) -> Option<(Region, Region)> {
        let grain = grain.max(1);
        if self.width() >= self.height() {
            if self.width() <= grain {
                return None;
            }
            let mid = self.x0 + self.width() / 2;
            Some((Region { x1: mid, ..*self }, Region { x0: mid, ..*self }))
        } else {
            if self.height() <= grain {
                return None;
            }
            let mid = self.y0 + self.height() / 2;
            Some((Region { y1: mid, ..*self }, Region { y0: mid, ..*self }))
        }
    }
}

/// A strategy for running one simulation tick over the grid.
pub trait Scheduler: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Update semantics this scheduler provides.
    fn consistency(&self) -> Consistency;

    /// Evaluate every cell exactly once and apply the resulting transitions.
    ///
    /// Blocks until all partitions have finished.
    fn run_tick(&mut self, grid: &CellGrid) -> Result<TickStats>;
}

/// Host scheduler selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerKind {
    /// Single-threaded reference.
    Sequential,
    /// Fixed static partitions, one thread each.
    Quadrant(QuadrantLayout),
    /// Work-stealing 2D range.
    Range2d(RangeConfig),
}

impl Default for SchedulerKind {
    fn default() -> Self {
        SchedulerKind::Quadrant(QuadrantLayout::default())
    }
}

/// Build a host scheduler.
///
/// Kernel offload needs a device backend and is built with
/// [`OffloadScheduler::new`] instead.
pub fn build(kind: &SchedulerKind, consistency: Consistency) -> Result<Box<dyn Scheduler>> {
    let scheduler: Box<dyn Scheduler> = match kind {
        SchedulerKind::Sequential => Box::new(SequentialScheduler::new(consistency)),
        SchedulerKind::Quadrant(layout) => Box::new(QuadrantScheduler::new(*layout, consistency)?),
        SchedulerKind::Range2d(config) => Box::new(Range2dScheduler::new(config.clone(), consistency)?),
    };
    Ok(scheduler)
}

/// Snapshot the grid if the scheduler reads from the previous generation.
pub(crate) fn snapshot_for(grid: &CellGrid, consistency: Consistency) -> Option<Generation> {
    match consistency {
        Consistency::InPlace => None,
        Consistency::Generational => Some(grid.snapshot()),
    }
}

/// Evaluate every cell of `region` and apply transitions to `grid`.
///
/// With a snapshot, states and neighbours are read from it; otherwise from
/// the live grid.
pub(crate) fn evaluate_region(
    grid: &CellGrid,
    snapshot: Option<&Generation>,
    region: Region,
) -> TickStats {
    match snapshot {
        Some(previous) => evaluate_region_from(grid, previous, region),
        None => evaluate_region_from(grid, grid, region),
    }
}

fn evaluate_region_from<S: CellSource>(grid: &CellGrid, view: &S, region: Region) -> TickStats {
    let mut stats = TickStats {
        partitions: 1,
        ..Default::default()
    };

    for x in region.x0..region.x1 {
        for y in region.y0..region.y1 {
            let current = view.state(x, y);
            match evaluate_state(view, x, y, current) {
                Transition::Stay => {}
                Transition::Infect => {
                    grid.store(grid.index(x, y), Transition::Infect.apply_to(current));
                    stats.infected += 1;
                }
                Transition::Heal => {
                    let healed = flood::heal(grid, x, y);
                    stats.healed += 1;
                    stats.cascaded += healed - 1;
                }
            }
        }
    }

    stats.evaluated = region.area();
    stats
}

/// Reject a grid whose size differs from the one a scheduler was built for.
pub(crate) fn check_dimensions(grid: &CellGrid, width: usize, height: usize) -> Result<()> {
    if grid.width() == width && grid.height() == height {
        Ok(())
    } else {
        Err(CellSimError::config(format!(
            "scheduler built for {}x{} grid, got {}x{}",
            width,
            height,
            grid.width(),
            grid.height()
        )))
    }
}
