//! Error types for the cell simulation.

use thiserror::Error;

/// Result type for cell simulation operations.
pub type Result<T> = std::result::Result<T, CellSimError>;

/// Errors that can occur while building or running the simulation.
#[derive(Error, Debug)]
pub enum CellSimError {
    /// Coordinate outside the grid.
    #[error("Coordinate ({x}, {y}) out of bounds for {width}x{height} grid")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    /// Invalid configuration (grid size, partition layout, fraction).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A buffer held a value that is not a cell state code.
    #[error("Invalid cell state code {code} at index {index}")]
    InvalidStateCode { code: u32, index: usize },

    /// No compute device available.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Kernel program failed to compile.
    #[error("Kernel build failed: {0}")]
    KernelBuild(String),

    /// Device or buffer creation failed.
    #[error("Device error: {0}")]
    Device(String),

    /// Kernel dispatch failed mid-tick.
    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    /// Host/device transfer failed.
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// A host worker thread could not be started.
    #[error("Worker error: {0}")]
    Worker(String),
}

impl CellSimError {
    /// Create an invalid configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a device error.
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Create a dispatch error.
    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }

    /// Create a transfer error.
    pub fn transfer(msg: impl Into<String>) -> Self {
        Self::Transfer(msg.into())
    }

    /// True for errors raised by device setup or dispatch.
    ///
    /// The tick driver treats these as fatal: grid consistency cannot be
    /// guaranteed after a partial device failure.
    pub fn is_device_failure(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable(_)
                | Self::KernelBuild(_)
                | Self::Device(_)
                | Self::Dispatch(_)
                | Self::Transfer(_)
                | Self::InvalidStateCode { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_message() {
        let err = CellSimError::OutOfBounds {
            x: 1024,
            y: 3,
            width: 1024,
            height: 768,
        };
        assert_eq!(
            err.to_string(),
            "Coordinate (1024, 3) out of bounds for 1024x768 grid"
        );
        assert!(!err.is_device_failure());
    }

    #[test]
    fn test_device_failure_classification() {
        assert!(CellSimError::dispatch("enqueue").is_device_failure());
        assert!(CellSimError::KernelBuild("log".into()).is_device_failure());
        assert!(!CellSimError::config("bad").is_device_failure());
    }
}
