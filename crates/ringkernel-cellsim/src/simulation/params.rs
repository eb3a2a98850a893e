//! Simulation parameters.

use std::time::Duration;

use super::seeder::DEFAULT_CANCER_FRACTION;
use crate::error::{CellSimError, Result};
use crate::scheduler::Consistency;

/// Default grid width in cells.
pub const DEFAULT_WIDTH: usize = 1024;
/// Default grid height in cells.
pub const DEFAULT_HEIGHT: usize = 768;
/// Default tick rate.
pub const DEFAULT_TICKS_PER_SECOND: u32 = 30;

/// Parameters for the cell simulation.
#[derive(Debug, Clone)]
pub struct SimParams {
    /// Grid width (columns).
    pub width: usize,
    /// Grid height (rows).
    pub height: usize,
    /// Period between ticks.
    pub tick_period: Duration,
    /// Minimum fraction of cells seeded as Cancer.
    pub initial_cancer_fraction: f64,
    /// RNG seed; `None` draws from entropy.
    pub seed: Option<u64>,
    /// Update semantics for host schedulers.
    pub consistency: Consistency,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            tick_period: Duration::from_millis(1000 / u64::from(DEFAULT_TICKS_PER_SECOND)),
            initial_cancer_fraction: DEFAULT_CANCER_FRACTION,
            seed: None,
            consistency: Consistency::default(),
        }
    }
}

impl SimParams {
    /// Create parameters for a `width x height` grid with default settings otherwise.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Set the tick period.
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Set the tick rate in ticks per second.
    pub fn with_tick_rate(mut self, ticks_per_second: u32) -> Self {
        self.tick_period = Duration::from_secs_f64(1.0 / f64::from(ticks_per_second.max(1)));
        self
    }

    /// Set the initial Cancer fraction.
    pub fn with_cancer_fraction(mut self, fraction: f64) -> Self {
        self.initial_cancer_fraction = fraction;
        self
    }

    /// Use a fixed RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set host scheduler update semantics.
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Check the parameters describe a runnable simulation.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CellSimError::config(format!(
                "grid dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        let cells = self.width.checked_mul(self.height).ok_or_else(|| {
            CellSimError::config(format!(
                "grid of {}x{} cells overflows",
                self.width, self.height
            ))
        })?;
        if u32::try_from(cells).is_err() {
            return Err(CellSimError::config(format!(
                "grid of {} cells exceeds device index range",
                cells
            )));
        }
        if !(0.0..=1.0).contains(&self.initial_cancer_fraction) {
            return Err(CellSimError::config(format!(
                "initial cancer fraction must be within [0, 1], got {}",
                self.initial_cancer_fraction
            )));
        }
        if self.tick_period.is_zero() {
            return Err(CellSimError::config("tick period must be non-zero"));
        }
        Ok(())
    }
}
