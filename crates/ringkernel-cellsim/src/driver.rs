//! Periodic tick driver and its collaborators.
//!
//! The driver owns the loop: drain input, apply stimuli, run one tick, hand
//! the grid to the renderer, then sleep out the rest of the tick period.
//! Stimuli and quit requests are only ever applied between ticks.

use std::collections::BTreeMap;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::context::SimulationContext;
use crate::error::{CellSimError, Result};
use crate::simulation::{CellGrid, StateCounts};

/// Event delivered by an input collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Inject medicine at grid coordinates (a left click).
    Inject { x: usize, y: usize },
    /// Stop the simulation.
    Quit,
}

/// Receives the grid after every tick.
pub trait Renderer {
    /// Draw the current generation.
    fn draw(&mut self, grid: &CellGrid, counts: StateCounts);
}

/// Supplies input events between ticks.
pub trait InputSource {
    /// Drain all events queued since the last call.
    fn poll(&mut self) -> Vec<InputEvent>;
}

impl InputSource for mpsc::Receiver<InputEvent> {
    fn poll(&mut self) -> Vec<InputEvent> {
        self.try_iter().collect()
    }
}

/// Outcome of a driver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks completed.
    pub ticks: u64,
    /// Stimuli applied.
    pub injected: usize,
    /// Stimuli dropped because they were out of bounds.
    pub dropped: usize,
    /// Whether the run ended on a quit event.
    pub quit: bool,
    /// Cell counts after the last tick.
    pub counts: StateCounts,
    /// Total wall-clock time.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Mean wall-clock time per completed tick.
    pub fn per_tick(&self) -> Duration {
        if self.ticks == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.elapsed.as_secs_f64() / self.ticks as f64)
    }
}

/// Runs ticks on a fixed period.
#[derive(Debug, Clone, Copy)]
pub struct TickDriver {
    period: Option<Duration>,
}

impl TickDriver {
    /// Driver sleeping out the remainder of `period` after each tick.
    pub fn new(period: Duration) -> Self {
        Self {
            period: Some(period),
        }
    }

    /// Driver running ticks back to back.
    pub fn unpaced() -> Self {
        Self { period: None }
    }

    /// Tick period, if paced.
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Run until a quit event, `max_ticks`, or a scheduler error.
    ///
    /// Out-of-bounds stimuli are logged and dropped. Any tick error shuts the
    /// context down and is returned; device failures are not recoverable.
    pub fn run<R, I>(
        &self,
        ctx: &mut SimulationContext,
        renderer: &mut R,
        input: &mut I,
        max_ticks: Option<u64>,
    ) -> Result<RunSummary>
    where
        R: Renderer + ?Sized,
        I: InputSource + ?Sized,
    {
        let start = Instant::now();
        let mut ticks = 0u64;
        let mut injected = 0;
        let mut dropped = 0;
        let mut quit = false;

        tracing::info!(
            scheduler = ctx.scheduler_name().unwrap_or("none"),
            period_ms = self.period.map(|p| p.as_millis() as u64),
            max_ticks,
            "Tick driver started"
        );

        while max_ticks.map_or(true, |max| ticks < max) {
            let tick_start = Instant::now();

            for event in input.poll() {
                match event {
                    InputEvent::Quit => {
                        quit = true;
                        break;
                    }
                    InputEvent::Inject { x, y } => match ctx.apply_stimulus(x, y) {
                        Ok(outcome) => {
                            injected += 1;
                            tracing::debug!(x, y, ?outcome, "Stimulus applied");
                        }
                        Err(CellSimError::OutOfBounds { .. }) => {
                            dropped += 1;
                            tracing::warn!(x, y, "Dropping out-of-bounds stimulus");
                        }
                        Err(e) => return Err(e),
                    },
                }
            }
            if quit {
                break;
            }

            if let Err(e) = ctx.tick() {
                if e.is_device_failure() {
                    tracing::error!("Device failure on tick {}: {}", ticks + 1, e);
                } else {
                    tracing::error!("Tick {} failed: {}", ticks + 1, e);
                }
                ctx.shutdown();
                return Err(e);
            }
            ticks += 1;

            renderer.draw(ctx.grid(), ctx.counts());

            if let Some(period) = self.period {
                if let Some(rest) = period.checked_sub(tick_start.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
        }

        let summary = RunSummary {
            ticks,
            injected,
            dropped,
            quit,
            counts: ctx.counts(),
            elapsed: start.elapsed(),
        };
        tracing::info!(
            ticks,
            injected,
            dropped,
            quit,
            "Tick driver stopped: {}",
            summary.counts
        );
        Ok(summary)
    }
}

impl Default for TickDriver {
    fn default() -> Self {
        Self::new(crate::simulation::SimParams::default().tick_period)
    }
}

/// Renderer that logs state counts through `tracing`.
#[derive(Debug, Clone)]
pub struct LogRenderer {
    every: u64,
    frames: u64,
}

impl LogRenderer {
    /// Log every `every`-th frame (at least every frame).
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            frames: 0,
        }
    }

    /// Frames drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for LogRenderer {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Renderer for LogRenderer {
    fn draw(&mut self, _grid: &CellGrid, counts: StateCounts) {
        self.frames += 1;
        if self.frames % self.every == 0 {
            tracing::info!(frame = self.frames, "{}", counts);
        }
    }
}

/// Input source replaying events at fixed tick indices.
///
/// Events scheduled at tick `n` are delivered before the `n`-th tick runs
/// (zero-based).
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    events: BTreeMap<u64, Vec<InputEvent>>,
    polls: u64,
}

impl ScriptedInput {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` before tick `tick`.
    pub fn at(mut self, tick: u64, event: InputEvent) -> Self {
        self.events.entry(tick).or_default().push(event);
        self
    }

    /// Inject medicine at `(x, y)` before tick `tick`.
    pub fn inject(self, tick: u64, x: usize, y: usize) -> Self {
        self.at(tick, InputEvent::Inject { x, y })
    }

    /// Quit before tick `tick`.
    pub fn quit(self, tick: u64) -> Self {
        self.at(tick, InputEvent::Quit)
    }

    /// Events not yet delivered.
    pub fn pending(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        let events = self.events.remove(&self.polls).unwrap_or_default();
        self.polls += 1;
        events
    }
}
