//! SSVEP detection
//!
//! One call to [`SsvepDetector::classify`] is one step of the online loop:
//! DC removal, zero-phase band-pass, channel selection, CCA against a
//! sine/cosine reference per stimulus frequency, arg-max and threshold.

use std::collections::HashMap;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use mindmaze_core::math::{self, ReferenceComponent};
use mindmaze_core::{Decision, FrequencyScores, ProcessingError, StimulusTarget};

use super::cca;
use super::filters::{BandpassFilter, FilterError};

/// Errors from a single detection step.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// Window or configuration rejected
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// Band-pass design or application failed
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Result type for detector operations
pub type DetectorResult<T> = Result<T, DetectorError>;

// ============================================================================
// Window
// ============================================================================

/// A block of multichannel EEG, channels × samples.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EegWindow {
    /// One row per channel, all of equal length
    pub channels: Vec<Vec<f64>>,
    /// Sampling rate in Hz
    pub sample_rate: f64,
}

impl EegWindow {
    /// Create a window.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::ShapeMismatch`] if channels differ in length,
    /// [`ProcessingError::InvalidSampleRate`] for a non-positive rate and
    /// [`ProcessingError::NonFinite`] for a NaN or infinite sample.
    pub fn new(channels: Vec<Vec<f64>>, sample_rate: f64) -> Result<Self, ProcessingError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ProcessingError::InvalidSampleRate { sample_rate });
        }
        if let Some(first) = channels.first() {
            if let Some(bad) = channels.iter().find(|c| c.len() != first.len()) {
                return Err(ProcessingError::ShapeMismatch {
                    left_rows: first.len(),
                    right_rows: bad.len(),
                });
            }
        }
        let window = Self { channels, sample_rate };
        window.check_finite()?;
        Ok(window)
    }

    /// First NaN or infinite sample, scanning channel by channel.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::NonFinite`] naming its position.
    pub fn check_finite(&self) -> Result<(), ProcessingError> {
        for (channel, row) in self.channels.iter().enumerate() {
            if let Some(sample) = row.iter().position(|v| !v.is_finite()) {
                return Err(ProcessingError::NonFinite { channel, sample });
            }
        }
        Ok(())
    }

    /// Number of channels
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples per channel
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// True when the window holds no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Window length in seconds
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Which EEG rows feed the CCA.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelSelection {
    /// Fixed channel indices
    Explicit(Vec<usize>),
    /// Last three channels, or all channels when fewer than three exist
    Posterior,
}

impl ChannelSelection {
    /// Channels used by the live board setup
    #[must_use]
    pub fn live_default() -> Self {
        Self::Explicit(vec![0, 4, 7])
    }

    /// Resolve to concrete indices for a window with `available` channels.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::ChannelOutOfRange`] for an explicit index
    /// past the end, and [`ProcessingError::InsufficientData`] when nothing
    /// would be selected.
    pub fn resolve(&self, available: usize) -> Result<Vec<usize>, ProcessingError> {
        let indices = match self {
            Self::Explicit(indices) => {
                if let Some(&index) = indices.iter().find(|&&i| i >= available) {
                    return Err(ProcessingError::ChannelOutOfRange { index, available });
                }
                indices.clone()
            }
            Self::Posterior if available >= 3 => (available - 3..available).collect(),
            Self::Posterior => (0..available).collect(),
        };
        if indices.is_empty() {
            return Err(ProcessingError::InsufficientData { available: 0, required: 1 });
        }
        Ok(indices)
    }
}

impl Default for ChannelSelection {
    fn default() -> Self {
        Self::live_default()
    }
}

/// Detector parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SsvepConfig {
    /// Candidate stimuli, in score order
    pub targets: Vec<StimulusTarget>,
    /// A decision needs a best score strictly above this
    pub threshold: f64,
    /// Band-pass low cutoff (Hz)
    pub low_hz: f64,
    /// Band-pass high cutoff (Hz)
    pub high_hz: f64,
    /// Butterworth order
    pub filter_order: usize,
    /// Channel subset
    pub channels: ChannelSelection,
}

impl Default for SsvepConfig {
    fn default() -> Self {
        Self {
            targets: StimulusTarget::default_set().to_vec(),
            threshold: 0.3,
            low_hz: 5.0,
            high_hz: 30.0,
            filter_order: 4,
            channels: ChannelSelection::default(),
        }
    }
}

// ============================================================================
// Detector
// ============================================================================

/// Scores and the optional decision for one window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// One score per target in [0, 1]
    pub scores: FrequencyScores,
    /// Present only when the best score clears the threshold
    pub decision: Option<Decision>,
}

/// Online SSVEP classifier.
#[derive(Debug)]
pub struct SsvepDetector {
    config: SsvepConfig,
    filter: BandpassFilter,
    /// Standardized reference blocks per (rate bits, length), one per target
    references: HashMap<(u64, usize), Vec<DMatrix<f64>>>,
}

impl SsvepDetector {
    /// Create a detector for windows sampled at `sample_rate`.
    ///
    /// # Errors
    ///
    /// Fails if no targets are configured or the passband cannot be designed
    /// at this rate.
    pub fn new(config: SsvepConfig, sample_rate: f64) -> DetectorResult<Self> {
        if config.targets.is_empty() {
            return Err(ProcessingError::NoTargets.into());
        }
        let filter = BandpassFilter::new(config.filter_order, sample_rate, config.low_hz, config.high_hz)?;
        Ok(Self { config, filter, references: HashMap::new() })
    }

    /// Detector configuration
    #[must_use]
    pub fn config(&self) -> &SsvepConfig {
        &self.config
    }

    /// Stimulus targets in score order
    #[must_use]
    pub fn targets(&self) -> &[StimulusTarget] {
        &self.config.targets
    }

    /// CCA score per target for one window.
    ///
    /// # Errors
    ///
    /// Fails on a non-finite sample, an out-of-range channel selection, a
    /// window too short for the filter or CCA, or a sample rate the passband
    /// does not fit.
    pub fn scores(&mut self, window: &EegWindow) -> DetectorResult<FrequencyScores> {
        // Fields are public, so a window may not have come through `new`
        window.check_finite()?;
        if window.len() < cca::MIN_ROWS {
            return Err(ProcessingError::InsufficientData {
                available: window.len(),
                required: cca::MIN_ROWS,
            }
            .into());
        }
        if (window.sample_rate - self.filter.sample_rate()).abs() > f64::EPSILON {
            debug!(
                from = self.filter.sample_rate(),
                to = window.sample_rate,
                "Redesigning band-pass for new sample rate"
            );
            self.filter = BandpassFilter::new(
                self.config.filter_order,
                window.sample_rate,
                self.config.low_hz,
                self.config.high_hz,
            )?;
        }

        let indices = self.config.channels.resolve(window.channel_count())?;

        // Each step is per channel, so selecting first is equivalent to
        // filtering everything and selecting afterwards.
        let mut selected: Vec<Vec<f64>> = indices.iter().map(|&i| window.channels[i].clone()).collect();
        // A flat input leaves rounding residue after DC removal, which the
        // filter turns into a transient; such channels carry no signal.
        let flat: Vec<bool> = selected.iter().map(|c| math::is_constant(c)).collect();
        for channel in &mut selected {
            math::remove_dc_offset(channel);
        }
        self.filter.filter_channels(&mut selected)?;
        for (channel, is_flat) in selected.iter_mut().zip(flat) {
            if is_flat {
                channel.fill(0.0);
            }
        }

        let n = window.len();
        let mut x = DMatrix::from_fn(n, selected.len(), |r, c| selected[c][r]);
        cca::standardize_columns(&mut x);

        let references = self.references_for(window.sample_rate, n);
        let mut scores = Vec::with_capacity(references.len());
        for reference in references {
            scores.push(cca::canonical_correlation(&x, reference)?);
        }
        Ok(FrequencyScores::new(scores))
    }

    /// Score a window and apply the threshold.
    ///
    /// # Errors
    ///
    /// See [`SsvepDetector::scores`].
    pub fn classify(&mut self, window: &EegWindow) -> DetectorResult<Detection> {
        let scores = self.scores(window)?;
        let decision = Decision::from_scores(&scores, &self.config.targets, self.config.threshold);
        Ok(Detection { scores, decision })
    }

    fn references_for(&mut self, sample_rate: f64, len: usize) -> &[DMatrix<f64>] {
        let targets = &self.config.targets;
        self.references
            .entry((sample_rate.to_bits(), len))
            .or_insert_with(|| {
                targets
                    .iter()
                    .map(|target| reference_block(target.frequency_hz, sample_rate, len))
                    .collect()
            })
    }
}

/// Standardized `len × 4` block of sin/cos at `freq_hz` and `2 * freq_hz`.
#[must_use]
pub fn reference_block(freq_hz: f64, sample_rate: f64, len: usize) -> DMatrix<f64> {
    let components = ReferenceComponent::ALL;
    let mut block = DMatrix::from_fn(len, components.len(), |r, c| {
        components[c].value(freq_hz, r as f64 / sample_rate)
    });
    cca::standardize_columns(&mut block);
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmaze_core::Direction;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    const FS: f64 = 250.0;

    /// Eight channels of noise with an SSVEP at `freq` (fundamental plus
    /// second harmonic) on channels 0, 4 and 7.
    fn window_with(freq: Option<f64>, amplitude: f64, seed: u64) -> EegWindow {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = 1000;
        let channels = (0..8)
            .map(|ch| {
                (0..n)
                    .map(|i| {
                        let t = i as f64 / FS;
                        let signal = match freq {
                            Some(f) if matches!(ch, 0 | 4 | 7) => {
                                amplitude
                                    * ((2.0 * PI * f * t).sin() + 0.5 * (2.0 * PI * 2.0 * f * t).sin())
                            }
                            _ => 0.0,
                        };
                        signal + rng.gen_range(-1.0..1.0) + 40.0
                    })
                    .collect()
            })
            .collect();
        EegWindow::new(channels, FS).unwrap()
    }

    #[test]
    fn test_detects_targets() {
        let mut detector = SsvepDetector::new(SsvepConfig::default(), FS).unwrap();
        // 20 Hz shares its fundamental with the 10 Hz harmonic reference and
        // its own harmonic lies outside the passband, so it is not asserted.
        for (i, target) in StimulusTarget::default_set().iter().enumerate().take(3) {
            let window = window_with(Some(target.frequency_hz), 2.0, i as u64);
            let detection = detector.classify(&window).unwrap();
            let decision = detection.decision.expect("strong SSVEP should be detected");
            assert_eq!(decision.target_index, i);
            assert_eq!(decision.direction, target.direction);
        }
    }

    #[test]
    fn test_scores_are_bounded() {
        let mut detector = SsvepDetector::new(SsvepConfig::default(), FS).unwrap();
        for seed in 0..4 {
            let scores = detector.scores(&window_with(None, 0.0, seed)).unwrap();
            assert_eq!(scores.len(), 4);
            assert!(scores.iter().all(|s| (0.0..=1.0).contains(&s)));
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        let window = window_with(Some(10.0), 2.0, 7);
        let mut detector = SsvepDetector::new(SsvepConfig::default(), FS).unwrap();
        let best = detector.scores(&window).unwrap().best().unwrap().1;

        let config = SsvepConfig { threshold: best, ..SsvepConfig::default() };
        let mut at_threshold = SsvepDetector::new(config, FS).unwrap();
        assert!(at_threshold.classify(&window).unwrap().decision.is_none());

        let config = SsvepConfig { threshold: best - 1e-9, ..SsvepConfig::default() };
        let mut below = SsvepDetector::new(config, FS).unwrap();
        let decision = below.classify(&window).unwrap().decision.unwrap();
        assert_eq!(decision.direction, Direction::Right);
    }

    #[test]
    fn test_noise_rarely_decides() {
        let config = SsvepConfig { threshold: 0.99, ..SsvepConfig::default() };
        let mut detector = SsvepDetector::new(config, FS).unwrap();
        let detection = detector.classify(&window_with(None, 0.0, 1)).unwrap();
        assert!(detection.decision.is_none());
    }

    #[test]
    fn test_constant_window_never_decides() {
        let mut detector = SsvepDetector::new(SsvepConfig::default(), FS).unwrap();
        for offset in [0.0, 0.1, 3.3, -42.7, 1234.5678] {
            let window = EegWindow::new(vec![vec![offset; 1000]; 8], FS).unwrap();
            let detection = detector.classify(&window).unwrap();
            assert!(detection.decision.is_none(), "offset {offset} decided");
            assert!(detection.scores.iter().all(|s| s == 0.0), "offset {offset} scored");
        }
    }

    #[test]
    fn test_one_flat_channel_still_detects() {
        let mut window = window_with(Some(15.0), 2.0, 3);
        window.channels[4] = vec![-42.7; window.len()];
        let mut detector = SsvepDetector::new(SsvepConfig::default(), FS).unwrap();
        let decision = detector.classify(&window).unwrap().decision.unwrap();
        assert_eq!(decision.direction, Direction::Down);
    }

    #[test]
    fn test_non_finite_samples_rejected() {
        let mut channels = vec![vec![1.0; 1000]; 8];
        channels[4][17] = f64::NAN;
        assert_eq!(
            EegWindow::new(channels.clone(), FS),
            Err(ProcessingError::NonFinite { channel: 4, sample: 17 })
        );

        // Built directly, bypassing `new`
        let window = EegWindow { channels, sample_rate: FS };
        let mut detector = SsvepDetector::new(SsvepConfig::default(), FS).unwrap();
        assert!(matches!(
            detector.classify(&window),
            Err(DetectorError::Processing(ProcessingError::NonFinite { channel: 4, sample: 17 }))
        ));

        let mut channels = vec![vec![1.0; 1000]; 8];
        channels[0][0] = f64::INFINITY;
        assert!(EegWindow::new(channels, FS).is_err());
    }

    #[test]
    fn test_posterior_selection() {
        assert_eq!(ChannelSelection::Posterior.resolve(8).unwrap(), vec![5, 6, 7]);
        assert_eq!(ChannelSelection::Posterior.resolve(2).unwrap(), vec![0, 1]);
        assert!(ChannelSelection::Posterior.resolve(0).is_err());
        assert_eq!(
            ChannelSelection::live_default().resolve(4),
            Err(ProcessingError::ChannelOutOfRange { index: 4, available: 4 })
        );
    }

    #[test]
    fn test_rejects_short_window() {
        let mut detector = SsvepDetector::new(SsvepConfig::default(), FS).unwrap();
        let window = EegWindow::new(vec![vec![0.0; 5]; 8], FS).unwrap();
        assert!(matches!(
            detector.scores(&window),
            Err(DetectorError::Processing(ProcessingError::InsufficientData { .. }))
        ));
    }

    #[test]
    fn test_requires_targets() {
        let config = SsvepConfig { targets: Vec::new(), ..SsvepConfig::default() };
        assert!(matches!(
            SsvepDetector::new(config, FS),
            Err(DetectorError::Processing(ProcessingError::NoTargets))
        ));
    }

    #[test]
    fn test_window_shape_checked() {
        assert!(EegWindow::new(vec![vec![0.0; 10], vec![0.0; 9]], FS).is_err());
        assert!(EegWindow::new(vec![vec![0.0; 10]], 0.0).is_err());
        let w = EegWindow::new(vec![vec![0.0; 500]; 3], FS).unwrap();
        assert_eq!((w.channel_count(), w.len()), (3, 500));
        assert!((w.duration_secs() - 2.0).abs() < 1e-12);
    }
}
