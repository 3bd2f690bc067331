//! Bridges from EEG hardware layouts to the classifier
//!
//! - [`streaming`]: BrainFlow-compatible board layout and ring buffer
//! - [`source`]: The [`EegSource`] trait and its synthetic and replay
//!   implementations
//!
//! ```rust,no_run
//! use mindmaze_native::bridge::{EegSource, SyntheticBoard, SyntheticBoardConfig};
//!
//! let mut board = SyntheticBoard::new(SyntheticBoardConfig::default());
//! board.start()?;
//!
//! if let Some(window) = board.next_window(1000)? {
//!     println!("{} channels x {} samples", window.channel_count(), window.len());
//! }
//! # Ok::<(), mindmaze_native::bridge::SourceError>(())
//! ```

pub mod source;
pub mod streaming;

pub use source::{
    EegSource, ReplaySource, SourceError, SourceResult, SyntheticBoard, SyntheticBoardConfig,
};
pub use streaming::{BoardId, BrainFlowBuffer, BrainFlowFormat, BrainFlowPacket};
