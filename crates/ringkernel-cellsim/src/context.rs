//! Simulation context.
//!
//! Owns everything one simulation needs: parameters, the grid, the RNG used
//! for seeding, and the scheduler. Construction always runs in the order
//! grid, seeder, scheduler, so a device backend is only brought up for a
//! grid that has already been seeded.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::compute::KernelBackend;
use crate::error::{CellSimError, Result};
use crate::scheduler::{self, OffloadScheduler, Scheduler, SchedulerKind, TickStats};
use crate::simulation::{
    apply_stimulus, seed, CellGrid, Generation, SimParams, StateCounts, StimulusOutcome,
};

/// A running cell simulation.
pub struct SimulationContext {
    params: SimParams,
    grid: CellGrid,
    rng: StdRng,
    scheduler: Option<Box<dyn Scheduler>>,
    ticks: u64,
}

impl SimulationContext {
    /// Create a simulation driven by a host scheduler.
    pub fn new(params: SimParams, kind: &SchedulerKind) -> Result<Self> {
        let (grid, rng) = Self::seeded_grid(&params)?;
        if let SchedulerKind::Quadrant(layout) = kind {
            layout.partitions(params.width, params.height)?;
        }
        let scheduler = scheduler::build(kind, params.consistency)?;
        Ok(Self::assemble(params, grid, rng, scheduler))
    }

    /// Create a simulation driven by kernel offload on `backend`.
    pub fn with_backend<B>(params: SimParams, backend: B) -> Result<Self>
    where
        B: KernelBackend + 'static,
    {
        let (grid, rng) = Self::seeded_grid(&params)?;
        let scheduler = OffloadScheduler::new(backend, params.width, params.height)?;
        Ok(Self::assemble(params, grid, rng, Box::new(scheduler)))
    }

    /// Create a simulation driven by a caller-supplied scheduler.
    pub fn with_scheduler(params: SimParams, scheduler: Box<dyn Scheduler>) -> Result<Self> {
        let (grid, rng) = Self::seeded_grid(&params)?;
        Ok(Self::assemble(params, grid, rng, scheduler))
    }

    fn seeded_grid(params: &SimParams) -> Result<(CellGrid, StdRng)> {
        params.validate()?;
        let grid = CellGrid::new(params.width, params.height)?;
        let mut rng = match params.seed {
            Some(value) => StdRng::seed_from_u64(value),
            None => StdRng::from_entropy(),
        };
        seed(&grid, params.initial_cancer_fraction, &mut rng)?;
        Ok((grid, rng))
    }

    fn assemble(
        params: SimParams,
        grid: CellGrid,
        rng: StdRng,
        scheduler: Box<dyn Scheduler>,
    ) -> Self {
        tracing::info!(
            width = params.width,
            height = params.height,
            scheduler = scheduler.name(),
            consistency = ?scheduler.consistency(),
            "Simulation ready: {}",
            grid.counts()
        );
        Self {
            params,
            grid,
            rng,
            scheduler: Some(scheduler),
            ticks: 0,
        }
    }

    /// Run one tick.
    ///
    /// Fails after [`shutdown`](Self::shutdown) or when the scheduler fails.
    pub fn tick(&mut self) -> Result<TickStats> {
        let scheduler = self
            .scheduler
            .as_mut()
            .ok_or_else(|| CellSimError::config("simulation has been shut down"))?;
        let stats = scheduler.run_tick(&self.grid)?;
        self.ticks += 1;
        tracing::debug!(
            tick = self.ticks,
            infected = stats.infected,
            healed = stats.healed,
            cascaded = stats.cascaded,
            elapsed_us = stats.elapsed.as_micros() as u64,
            "Tick complete"
        );
        Ok(stats)
    }

    /// Inject medicine at `(x, y)`. Only call between ticks.
    pub fn apply_stimulus(&mut self, x: usize, y: usize) -> Result<StimulusOutcome> {
        apply_stimulus(&self.grid, x, y)
    }

    /// Current number of cells in each state.
    pub fn counts(&self) -> StateCounts {
        self.grid.counts()
    }

    /// Read-only access to the live grid.
    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    /// Snapshot of the current generation.
    pub fn generation(&self) -> Generation {
        self.grid.snapshot()
    }

    /// The parameters the simulation was built with.
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Number of ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Name of the active scheduler, or `None` after shutdown.
    pub fn scheduler_name(&self) -> Option<&'static str> {
        self.scheduler.as_ref().map(|s| s.name())
    }

    /// Reseed the grid from the context's RNG and reset the tick counter.
    pub fn reseed(&mut self) -> Result<usize> {
        let placed = seed(&self.grid, self.params.initial_cancer_fraction, &mut self.rng)?;
        self.ticks = 0;
        tracing::info!(placed, "Grid reseeded");
        Ok(placed)
    }

    /// Release the scheduler and any device resources it holds.
    pub fn shutdown(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            tracing::info!(
                scheduler = scheduler.name(),
                ticks = self.ticks,
                "Shutting down: {}",
                self.grid.counts()
            );
        }
    }
}

impl std::fmt::Debug for SimulationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationContext")
            .field("params", &self.params)
            .field("grid", &self.grid)
            .field("scheduler", &self.scheduler_name())
            .field("ticks", &self.ticks)
            .finish()
    }
}
