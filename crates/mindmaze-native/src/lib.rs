//! MindMaze Native - Host SSVEP processing and the maze game
//!
//! This crate provides the host side of the game:
//! - Signal processing (band-pass filtering, CCA, FFT power)
//! - The SSVEP detector that turns a window of EEG into at most one move
//! - EEG sources: a synthetic BrainFlow-style board and recording replay
//! - The background classifier worker and its non-blocking move queue
//! - The renderer-independent game session
//!
//! # Modules
//!
//! - [`bridge`]: EEG sources and the BrainFlow board layout
//! - [`processing`]: Signal processing pipelines
//! - [`classifier`]: Worker thread, queue and shared status
//! - [`game`]: Maze session, player and stimuli
//! - [`recording`]: CSV recordings
//! - [`config`]: TOML configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod bridge;
pub mod classifier;
pub mod config;
pub mod game;
pub mod processing;
pub mod recording;
pub mod simulation;

/// Game window (requires `viz` feature)
#[cfg(feature = "viz")]
pub mod viz;

// Re-export key types
pub use classifier::{ClassifierStatus, ClassifierWorker, MovementQueue, SharedStatus, WorkerConfig};
pub use config::MindMazeConfig;
pub use game::{GameLayout, GameSession};
pub use processing::ssvep::{Detection, EegWindow, SsvepConfig, SsvepDetector};
pub use recording::{Recording, RecordingMetadata};
pub use simulation::{SsvepSimulator, SyntheticParams};
