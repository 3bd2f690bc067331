//! Digital filters for EEG processing
//!
//! Butterworth band-pass design and zero-phase (forward-backward)
//! application are delegated to the `butterworth` crate; this module only
//! validates the passband and maps the window layout onto it.

use butterworth::{Cutoff, Filter};
use thiserror::Error;

use mindmaze_core::ProcessingError;

/// Errors from filter design or application.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Passband rejected before design
    #[error("{0}")]
    Config(ProcessingError),

    /// The filter library refused the design or the data
    #[error("Butterworth filter failed: {0}")]
    Backend(String),
}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Zero-phase Butterworth band-pass filter.
pub struct BandpassFilter {
    filter: Filter,
    sample_rate: f64,
    low_hz: f64,
    high_hz: f64,
    order: usize,
}

impl BandpassFilter {
    /// Design a band-pass filter.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Config`] when the order is zero, the sample rate
    /// is not positive, or the passband is not `0 < low < high < Nyquist`.
    pub fn new(order: usize, sample_rate: f64, low_hz: f64, high_hz: f64) -> FilterResult<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(FilterError::Config(ProcessingError::InvalidSampleRate { sample_rate }));
        }
        if order == 0 {
            return Err(invalid("order must be at least 1"));
        }
        if !(low_hz > 0.0) {
            return Err(invalid("low cutoff must be positive"));
        }
        if low_hz >= high_hz {
            return Err(invalid("low cutoff must be below high cutoff"));
        }
        if high_hz >= sample_rate / 2.0 {
            return Err(invalid("high cutoff must be below Nyquist"));
        }

        let filter = Filter::new(order, sample_rate, Cutoff::BandPass(low_hz, high_hz))
            .map_err(|e| FilterError::Backend(format!("{e:?}")))?;

        Ok(Self { filter, sample_rate, low_hz, high_hz, order })
    }

    /// Passband `(low, high)` in Hz
    #[must_use]
    pub fn passband(&self) -> (f64, f64) {
        (self.low_hz, self.high_hz)
    }

    /// Sample rate the filter was designed for
    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Filter order
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Filter a single channel forwards then backwards (no phase shift).
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Backend`] if the library rejects the input,
    /// e.g. when it is shorter than the filter's padding.
    pub fn filter_zero_phase(&self, samples: &[f64]) -> FilterResult<Vec<f64>> {
        let data = samples.to_vec();
        self.filter
            .bidirectional(&data)
            .map_err(|e| FilterError::Backend(format!("{e:?}")))
    }

    /// Filter every channel of a channels × samples block in place.
    ///
    /// # Errors
    ///
    /// Propagates the first channel failure.
    pub fn filter_channels(&self, channels: &mut [Vec<f64>]) -> FilterResult<()> {
        for channel in channels.iter_mut() {
            *channel = self.filter_zero_phase(channel)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for BandpassFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandpassFilter")
            .field("sample_rate", &self.sample_rate)
            .field("low_hz", &self.low_hz)
            .field("high_hz", &self.high_hz)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

fn invalid(reason: &'static str) -> FilterError {
    FilterError::Config(ProcessingError::InvalidFilterConfig { reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmaze_core::math;
    use std::f64::consts::PI;

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    fn rms(x: &[f64]) -> f64 {
        (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
    }

    #[test]
    fn test_rejects_bad_passband() {
        assert!(matches!(
            BandpassFilter::new(4, 250.0, 30.0, 5.0),
            Err(FilterError::Config(ProcessingError::InvalidFilterConfig { .. }))
        ));
        assert!(BandpassFilter::new(4, 250.0, 5.0, 125.0).is_err());
        assert!(BandpassFilter::new(4, 250.0, 0.0, 30.0).is_err());
        assert!(BandpassFilter::new(0, 250.0, 5.0, 30.0).is_err());
        assert!(matches!(
            BandpassFilter::new(4, 0.0, 5.0, 30.0),
            Err(FilterError::Config(ProcessingError::InvalidSampleRate { .. }))
        ));
    }

    #[test]
    fn test_passband_kept_stopband_removed() {
        let fs = 250.0;
        let filter = BandpassFilter::new(4, fs, 5.0, 30.0).unwrap();

        let inside = sine(12.0, fs, 1000);
        let outside = sine(60.0, fs, 1000);

        let kept = filter.filter_zero_phase(&inside).unwrap();
        let removed = filter.filter_zero_phase(&outside).unwrap();

        // Compare away from the edges
        let mid = 200..800;
        assert!(rms(&kept[mid.clone()]) > 0.5 * rms(&inside[mid.clone()]));
        assert!(rms(&removed[mid.clone()]) < 0.1 * rms(&outside[mid]));
    }

    #[test]
    fn test_zero_phase_keeps_peak_alignment() {
        let fs = 250.0;
        let filter = BandpassFilter::new(4, fs, 5.0, 30.0).unwrap();
        let input = sine(10.0, fs, 1000);
        let output = filter.filter_zero_phase(&input).unwrap();

        // In phase with the input: strongly positive correlation in the middle
        let r = math::pearson(&input[250..750], &output[250..750]);
        assert!(r > 0.95, "correlation {r}");
    }

    #[test]
    fn test_filter_channels_in_place() {
        let fs = 250.0;
        let filter = BandpassFilter::new(4, fs, 5.0, 30.0).unwrap();
        let mut block = vec![vec![1.0; 1000], sine(10.0, fs, 1000)];
        filter.filter_channels(&mut block).unwrap();
        assert_eq!(block.len(), 2);
        assert_eq!(block[0].len(), 1000);
        // DC is outside the passband
        assert!(rms(&block[0][300..700]) < 0.05);
    }
}
