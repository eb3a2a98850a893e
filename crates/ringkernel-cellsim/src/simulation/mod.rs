//! Simulation core: grid store, transition rule, flood propagation,
//! seeding and medicine injection.

mod cell;
mod grid;
mod params;

pub mod flood;
pub mod rules;
pub mod seeder;
pub mod stimulus;

pub use cell::{moore_neighbors, CellState, StateCounts};
pub use grid::{CellGrid, CellSource, EncodedView, Generation};
pub use params::{SimParams, DEFAULT_HEIGHT, DEFAULT_TICKS_PER_SECOND, DEFAULT_WIDTH};
pub use rules::{evaluate, evaluate_state, Transition, NEIGHBOR_THRESHOLD};
pub use seeder::{seed, DEFAULT_CANCER_FRACTION};
pub use stimulus::{apply_stimulus, StimulusOutcome};
