//! Board data streaming formats
//!
//! - [`brainflow`]: BrainFlow-compatible board layout and ring buffer

pub mod brainflow;

pub use brainflow::{BoardId, BrainFlowBuffer, BrainFlowFormat, BrainFlowPacket};
