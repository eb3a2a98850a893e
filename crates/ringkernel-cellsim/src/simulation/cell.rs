//! Cell states and Moore-neighbourhood helpers.

use crate::error::{CellSimError, Result};

/// State of a single grid cell.
///
/// The discriminants are the integer codes shared with device buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CellState {
    /// Healthy tissue.
    #[default]
    Healthy = 0,
    /// Cancerous tissue.
    Cancer = 1,
    /// Injected medicine.
    Medicine = 2,
}

impl CellState {
    /// All states in code order.
    pub const ALL: [CellState; 3] = [CellState::Healthy, CellState::Cancer, CellState::Medicine];

    /// Integer code used in device buffers.
    #[inline(always)]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Decode a state from its integer code.
    #[inline]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(CellState::Healthy),
            1 => Some(CellState::Cancer),
            2 => Some(CellState::Medicine),
            _ => None,
        }
    }

    /// Decode a state from a raw byte stored in the grid.
    ///
    /// The grid only ever stores valid codes, so unknown bytes map to Healthy.
    #[inline(always)]
    pub(crate) const fn from_byte(byte: u8) -> Self {
        match byte {
            1 => CellState::Cancer,
            2 => CellState::Medicine,
            _ => CellState::Healthy,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            CellState::Healthy => "Healthy",
            CellState::Cancer => "Cancer",
            CellState::Medicine => "Medicine",
        }
    }
}

impl TryFrom<u32> for CellState {
    type Error = CellSimError;

    fn try_from(code: u32) -> Result<Self> {
        Self::from_code(code).ok_or(CellSimError::InvalidStateCode { code, index: 0 })
    }
}

impl std::fmt::Display for CellState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of cells in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts {
    pub healthy: usize,
    pub cancer: usize,
    pub medicine: usize,
}

impl StateCounts {
    /// Count for a single state.
    pub fn get(&self, state: CellState) -> usize {
        match state {
            CellState::Healthy => self.healthy,
            CellState::Cancer => self.cancer,
            CellState::Medicine => self.medicine,
        }
    }

    /// Record one more cell in `state`.
    #[inline]
    pub fn add(&mut self, state: CellState) {
        match state {
            CellState::Healthy => self.healthy += 1,
            CellState::Cancer => self.cancer += 1,
            CellState::Medicine => self.medicine += 1,
        }
    }

    /// Total number of cells counted.
    pub fn total(&self) -> usize {
        self.healthy + self.cancer + self.medicine
    }
}

impl std::fmt::Display for StateCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "healthy={} cancer={} medicine={}",
            self.healthy, self.cancer, self.medicine
        )
    }
}

/// Offsets of the 8 Moore neighbours.
const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Iterate the in-bounds Moore neighbours of `(x, y)` on a `width x height` grid.
///
/// Corner cells yield 3 neighbours, edge cells 5, interior cells 8.
#[inline]
pub fn moore_neighbors(
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> impl Iterator<Item = (usize, usize)> {
    NEIGHBOR_OFFSETS.iter().filter_map(move |&(dx, dy)| {
        let nx = x.checked_add_signed(dx)?;
        let ny = y.checked_add_signed(dy)?;
        (nx < width && ny < height).then_some((nx, ny))
    })
}
