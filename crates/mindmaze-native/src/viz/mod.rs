//! Desktop game window
//!
//! Draws the maze, the player and the four flickering stimuli with egui and
//! overlays the classifier panels. Enable with the `viz` feature:
//! ```toml
//! mindmaze-native = { version = "0.1", features = ["viz"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mindmaze_native::game::{GameLayout, GameSession};
//! use mindmaze_native::viz::{run_app, ViewConfig};
//! use mindmaze_core::StimulusTarget;
//!
//! let session = GameSession::new(GameLayout::default(), &StimulusTarget::default_set(), 7)?;
//! run_app(session, None, Vec::new(), ViewConfig::default())?;
//! ```

#[cfg(feature = "viz")]
mod app;

#[cfg(feature = "viz")]
pub use app::{run_app, MindMazeApp, ViewConfig};
