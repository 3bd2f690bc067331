//! MindMaze Core - `no_std` compatible types and utilities
//!
//! This crate provides the foundational types, statistics helpers and the
//! maze model shared by the MindMaze host tools. It is designed to work in
//! `no_std` environments (with `alloc`) as well as `std` environments.
//!
//! # Modules
//!
//! - [`types`]: Stimulus targets, directions, score vectors and decisions
//! - [`error`]: Error types for signal processing and maze generation
//! - [`math`]: Column statistics and SSVEP reference waveforms
//! - [`maze`]: Grid maze carved by randomized depth-first search
//!
//! # Features
//!
//! - `std`: Enable standard library support
//!
//! # Example
//!
//! ```rust
//! use mindmaze_core::types::{Direction, FrequencyScores, StimulusTarget};
//!
//! let targets = StimulusTarget::default_set();
//! let scores = FrequencyScores::from_slice(&[0.12, 0.41, 0.08, 0.10]);
//!
//! let (best, score) = scores.best().unwrap();
//! assert_eq!(targets[best].direction, Direction::Right);
//! assert!(score > 0.4);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod math;
pub mod maze;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{MazeError, ProcessingError};
pub use maze::{Cell, Maze};
pub use types::{
    Decision, Direction, EegChannel, FrequencyScores, StimulusShape, StimulusTarget,
};
