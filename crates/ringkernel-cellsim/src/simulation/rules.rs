//! Local-majority transition rule.
//!
//! A Healthy cell with at least [`NEIGHBOR_THRESHOLD`] Cancer neighbours
//! becomes Cancer. A Cancer cell with at least [`NEIGHBOR_THRESHOLD`] Medicine
//! neighbours is healed, which triggers the flood propagator. Medicine never
//! changes under the rule.
//!
//! Boundary cells have at most 5 neighbours and can never reach the threshold.

use super::cell::{moore_neighbors, CellState};
use super::grid::CellSource;

/// Neighbours of the target state needed to trigger a transition.
pub const NEIGHBOR_THRESHOLD: usize = 6;

/// Outcome of evaluating the rule for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No change.
    Stay,
    /// Healthy becomes Cancer.
    Infect,
    /// Cancer is healed together with its connected Medicine.
    Heal,
}

impl Transition {
    /// State the evaluated cell holds after the transition (ignoring the cascade).
    pub fn apply_to(self, current: CellState) -> CellState {
        match self {
            Transition::Stay => current,
            Transition::Infect => CellState::Cancer,
            Transition::Heal => CellState::Healthy,
        }
    }
}

/// Count the Moore neighbours of `(x, y)` that hold `target`.
#[inline]
pub fn count_neighbors<S: CellSource + ?Sized>(
    view: &S,
    x: usize,
    y: usize,
    target: CellState,
) -> usize {
    moore_neighbors(x, y, view.width(), view.height())
        .filter(|&(nx, ny)| view.state(nx, ny) == target)
        .count()
}

/// Evaluate the rule for a cell whose current state is `current`.
///
/// `current` is passed separately so a worker can evaluate the state it just
/// loaded while neighbours are read from `view`.
#[inline]
pub fn evaluate_state<S: CellSource + ?Sized>(
    view: &S,
    x: usize,
    y: usize,
    current: CellState,
) -> Transition {
    match current {
        CellState::Medicine => Transition::Stay,
        CellState::Healthy => {
            if count_neighbors(view, x, y, CellState::Cancer) >= NEIGHBOR_THRESHOLD {
                Transition::Infect
            } else {
                Transition::Stay
            }
        }
        CellState::Cancer => {
            if count_neighbors(view, x, y, CellState::Medicine) >= NEIGHBOR_THRESHOLD {
                Transition::Heal
            } else {
                Transition::Stay
            }
        }
    }
}

/// Evaluate the rule for `(x, y)` reading both the cell and its neighbours from `view`.
#[inline]
pub fn evaluate<S: CellSource + ?Sized>(view: &S, x: usize, y: usize) -> Transition {
    evaluate_state(view, x, y, view.state(x, y))
}
