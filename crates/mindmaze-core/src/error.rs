//! Error types for MindMaze
//!
//! This module provides custom error types that work in `no_std` environments.
//! Errors carry the offending values so that a failed window can be logged
//! without re-running the computation.

use core::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Processing Errors
// ============================================================================

/// Errors during SSVEP signal processing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProcessingError {
    /// Not enough samples in the window
    InsufficientData {
        /// Number of samples available
        available: usize,
        /// Number of samples required
        required: usize,
    },
    /// Filter configuration invalid
    InvalidFilterConfig {
        /// Description of the issue
        reason: &'static str,
    },
    /// A selected channel does not exist in the window
    ChannelOutOfRange {
        /// Requested channel index
        index: usize,
        /// Number of channels in the window
        available: usize,
    },
    /// Two blocks that must share a sample axis do not
    ShapeMismatch {
        /// Rows in the first block
        left_rows: usize,
        /// Rows in the second block
        right_rows: usize,
    },
    /// No stimulus targets configured
    NoTargets,
    /// Sampling rate is zero, negative or not finite
    InvalidSampleRate {
        /// Offending rate in Hz
        sample_rate: f64,
    },
    /// A sample is NaN or infinite
    NonFinite {
        /// Channel (row) index
        channel: usize,
        /// Sample index within the channel
        sample: usize,
    },
    /// An iterative decomposition hit its iteration limit
    NoConvergence,
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientData { available, required } => {
                write!(f, "Insufficient data: {available}/{required} samples")
            }
            Self::InvalidFilterConfig { reason } => {
                write!(f, "Invalid filter config: {reason}")
            }
            Self::ChannelOutOfRange { index, available } => {
                write!(f, "Channel {index} out of range ({available} channels available)")
            }
            Self::ShapeMismatch { left_rows, right_rows } => {
                write!(f, "Shape mismatch: {left_rows} rows vs {right_rows} rows")
            }
            Self::NoTargets => write!(f, "No stimulus targets configured"),
            Self::InvalidSampleRate { sample_rate } => {
                write!(f, "Invalid sample rate: {sample_rate} Hz")
            }
            Self::NonFinite { channel, sample } => {
                write!(f, "Non-finite sample at channel {channel}, index {sample}")
            }
            Self::NoConvergence => write!(f, "Decomposition did not converge"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProcessingError {}

// ============================================================================
// Maze Errors
// ============================================================================

/// Errors from maze construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MazeError {
    /// Grid too small to hold the start cell inside a wall border
    TooSmall {
        /// Requested width in cells
        width: usize,
        /// Requested height in cells
        height: usize,
    },
}

impl fmt::Display for MazeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooSmall { width, height } => {
                write!(f, "Maze {width}x{height} too small (minimum 3x3)")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MazeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_display_messages() {
        let err = ProcessingError::InsufficientData { available: 4, required: 10 };
        assert_eq!(err.to_string(), "Insufficient data: 4/10 samples");

        let err = ProcessingError::ChannelOutOfRange { index: 9, available: 8 };
        assert_eq!(err.to_string(), "Channel 9 out of range (8 channels available)");

        let err = ProcessingError::NonFinite { channel: 7, sample: 500 };
        assert_eq!(err.to_string(), "Non-finite sample at channel 7, index 500");

        let err = MazeError::TooSmall { width: 2, height: 5 };
        assert_eq!(err.to_string(), "Maze 2x5 too small (minimum 3x3)");
    }
}
