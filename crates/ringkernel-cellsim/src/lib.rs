//! # RingKernel CellSim
//!
//! Parallel 2D cell-growth simulation. Every cell of a `width x height` grid
//! is Healthy, Cancer or Medicine. Each tick a Healthy cell with at least six
//! Cancer neighbours turns Cancer, and a Cancer cell with at least six
//! Medicine neighbours is healed, which also floods its whole connected
//! Medicine region back to Healthy. Medicine is injected between ticks.
//!
//! The same tick can be run by four interchangeable schedulers:
//!
//! - a single-threaded reference
//! - a fixed grid of partitions, one OS thread each
//! - a work-stealing 2D range on rayon
//! - kernel offload through a [`compute::KernelBackend`] (host emulation, or
//!   WebGPU with the `wgpu` feature)
//!
//! ## Run
//!
//! ```bash
//! cargo run -p ringkernel-cellsim --bin cellsim -- --ticks 300 --scheduler range2d
//! ```
//!
//! ## Example
//!
//! ```
//! use ringkernel_cellsim::{SchedulerKind, SimParams, SimulationContext};
//!
//! let params = SimParams::new(64, 48).with_seed(1);
//! let mut ctx = SimulationContext::new(params, &SchedulerKind::Sequential).unwrap();
//! ctx.apply_stimulus(10, 10).unwrap();
//! ctx.tick().unwrap();
//! assert_eq!(ctx.counts().total(), 64 * 48);
//! ```

pub mod compute;
pub mod context;
pub mod driver;
pub mod error;
pub mod scheduler;
pub mod simulation;

pub use context::SimulationContext;
pub use driver::{InputEvent, InputSource, LogRenderer, Renderer, RunSummary, ScriptedInput, TickDriver};
pub use error::{CellSimError, Result};
pub use scheduler::{Consistency, Scheduler, SchedulerKind, TickStats};
pub use simulation::{CellGrid, CellState, SimParams, StateCounts, StimulusOutcome};

pub use compute::{EmulatedBackend, KernelBackend};

#[cfg(feature = "wgpu")]
pub use compute::WgpuBackend;
