//! FFT-based spectral summary
//!
//! Used offline to check whether a recording carries power at the stimulus
//! frequencies before it is replayed through the detector.

use std::f64::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use mindmaze_core::{ProcessingError, StimulusTarget};

/// Hann-tapered periodogram over a fixed segment length.
///
/// Planning happens once in [`SpectralAnalyzer::new`], so
/// [`SpectralAnalyzer::compute_psd`] can be called per channel.
pub struct SpectralAnalyzer {
    sample_rate: f64,
    fft: Arc<dyn Fft<f64>>,
    taper: Vec<f64>,
    /// `1 / (fs * sum(w^2))`
    density_scale: f64,
    spectrum: Vec<Complex64>,
    work: Vec<Complex64>,
}

impl SpectralAnalyzer {
    /// Analyzer for segments of `fft_size` samples at `sample_rate` Hz
    #[must_use]
    pub fn new(fft_size: usize, sample_rate: f64) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        let taper = hann(fft_size);
        let taper_energy: f64 = taper.iter().map(|w| w * w).sum();
        let density_scale = if taper_energy > 0.0 { (sample_rate * taper_energy).recip() } else { 0.0 };

        Self {
            sample_rate,
            spectrum: vec![Complex64::default(); fft_size],
            work: vec![Complex64::default(); fft.get_inplace_scratch_len()],
            fft,
            taper,
            density_scale,
        }
    }

    /// Segment length
    #[must_use]
    pub fn fft_size(&self) -> usize {
        self.taper.len()
    }

    /// Hz between adjacent bins
    #[must_use]
    pub fn frequency_resolution(&self) -> f64 {
        self.sample_rate / self.fft_size() as f64
    }

    /// One-sided power spectral density (units²/Hz) of the first
    /// `fft_size` samples, bins `0..=fft_size / 2`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::InsufficientData`] for fewer than
    /// `fft_size` samples.
    pub fn compute_psd(&mut self, samples: &[f64]) -> Result<Vec<f64>, ProcessingError> {
        let n = self.fft_size();
        let Some(segment) = samples.get(..n) else {
            return Err(ProcessingError::InsufficientData { available: samples.len(), required: n });
        };
        if n == 0 {
            return Ok(Vec::new());
        }

        for ((bin, &x), &w) in self.spectrum.iter_mut().zip(segment).zip(&self.taper) {
            *bin = Complex64::new(x * w, 0.0);
        }
        self.fft.process_with_scratch(&mut self.spectrum, &mut self.work);

        let nyquist = n / 2;
        let psd = self.spectrum[..=nyquist]
            .iter()
            .enumerate()
            .map(|(k, c)| {
                // DC and an even-length Nyquist bin have no mirror image
                let unpaired = k == 0 || (n % 2 == 0 && k == nyquist);
                let fold = if unpaired { 1.0 } else { 2.0 };
                fold * c.norm_sqr() * self.density_scale
            })
            .collect();
        Ok(psd)
    }

    /// Summed power over `[low_hz, high_hz]`
    #[must_use]
    pub fn band_power(&self, psd: &[f64], low_hz: f64, high_hz: f64) -> f64 {
        match self.bin_range(psd, low_hz, high_hz) {
            Some((start, end)) => psd[start..=end].iter().sum(),
            None => 0.0,
        }
    }

    /// Strongest bin within `[low_hz, high_hz]` as `(frequency, power)`
    #[must_use]
    pub fn peak_frequency(&self, psd: &[f64], low_hz: f64, high_hz: f64) -> Option<(f64, f64)> {
        let (start, end) = self.bin_range(psd, low_hz, high_hz)?;
        let res = self.frequency_resolution();
        psd[start..=end]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, &p)| ((start + i) as f64 * res, p))
    }

    /// Power in a ±1 bin neighbourhood of each target frequency
    #[must_use]
    pub fn stimulus_powers(&self, psd: &[f64], targets: &[StimulusTarget]) -> Vec<f64> {
        let res = self.frequency_resolution();
        targets
            .iter()
            .map(|t| self.band_power(psd, t.frequency_hz - res, t.frequency_hz + res))
            .collect()
    }

    fn bin_range(&self, psd: &[f64], low_hz: f64, high_hz: f64) -> Option<(usize, usize)> {
        if psd.is_empty() || high_hz < low_hz {
            return None;
        }
        let res = self.frequency_resolution();
        let start = (low_hz.max(0.0) / res).floor() as usize;
        let end = ((high_hz / res).ceil() as usize).min(psd.len() - 1);
        (start <= end).then_some((start, end))
    }
}

impl std::fmt::Debug for SpectralAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralAnalyzer")
            .field("fft_size", &self.fft_size())
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

/// Symmetric Hann taper, `sin²(πi / (len - 1))`
fn hann(len: usize) -> Vec<f64> {
    if len < 2 {
        return vec![1.0; len];
    }
    let step = PI / (len - 1) as f64;
    (0..len).map(|i| (step * i as f64).sin().powi(2)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / 250.0).sin())
            .collect()
    }

    #[test]
    fn test_peak_frequency() {
        let mut analyzer = SpectralAnalyzer::new(1000, 250.0);
        let psd = analyzer.compute_psd(&sine(15.0, 1000)).unwrap();

        let (freq, _) = analyzer.peak_frequency(&psd, 1.0, 50.0).unwrap();
        assert!((freq - 15.0).abs() <= analyzer.frequency_resolution());
    }

    #[test]
    fn test_stimulus_powers_rank_the_driven_target() {
        let mut analyzer = SpectralAnalyzer::new(1000, 250.0);
        let psd = analyzer.compute_psd(&sine(10.0, 1000)).unwrap();

        let powers = analyzer.stimulus_powers(&psd, &StimulusTarget::default_set());
        let best = powers
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(best, Some(1));
    }

    #[test]
    fn test_psd_integrates_to_signal_power() {
        // A unit sine carries 0.5 power; the taper spreads it over a few bins
        let mut analyzer = SpectralAnalyzer::new(1000, 250.0);
        let psd = analyzer.compute_psd(&sine(12.0, 1000)).unwrap();
        assert_eq!(psd.len(), 501);
        let total: f64 = psd.iter().sum::<f64>() * analyzer.frequency_resolution();
        assert!((total - 0.5).abs() < 0.02, "total power {total}");
    }

    #[test]
    fn test_short_input_rejected() {
        let mut analyzer = SpectralAnalyzer::new(256, 250.0);
        assert_eq!(
            analyzer.compute_psd(&[0.0; 100]),
            Err(ProcessingError::InsufficientData { available: 100, required: 256 })
        );
    }
}
