//! Signal processing pipelines
//!
//! This module provides signal processing for SSVEP classification:
//! - [`filters`]: Zero-phase Butterworth band-pass
//! - [`cca`]: First canonical correlation between two blocks
//! - [`ssvep`]: The per-window detector
//! - [`spectrum`]: FFT power spectrum and peak search

pub mod cca;
pub mod filters;
pub mod spectrum;
pub mod ssvep;
