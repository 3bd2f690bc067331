//! Synthetic SSVEP EEG
//!
//! Generates multichannel background EEG with an SSVEP added to the
//! occipital channels. The attended stimulus changes every segment, cycling
//! through the configured frequencies, so a classifier fed from this source
//! should report each frequency in turn.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use mindmaze_core::StimulusTarget;

/// Simulation configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticParams {
    /// Sample rate (Hz)
    pub sample_rate: f64,
    /// Number of EEG channels
    pub channel_count: usize,
    /// Attended frequencies, one per segment, cycled
    pub frequencies: Vec<f64>,
    /// Length of each attended segment (s)
    pub segment_secs: f64,
    /// SSVEP amplitude (µV)
    pub signal_uv: f64,
    /// Second-harmonic amplitude relative to the fundamental
    pub harmonic_ratio: f64,
    /// Background noise standard deviation (µV)
    pub noise_uv: f64,
    /// Channels carrying the SSVEP
    pub signal_channels: Vec<usize>,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            sample_rate: 250.0,
            channel_count: 8,
            frequencies: StimulusTarget::default_set().iter().map(|t| t.frequency_hz).collect(),
            segment_secs: 5.0,
            signal_uv: 3.0,
            harmonic_ratio: 0.0,
            noise_uv: 10.0,
            // O1 and O2 on an eight-channel cap
            signal_channels: vec![6, 7],
        }
    }
}

/// Sample-by-sample SSVEP generator.
#[derive(Debug)]
pub struct SsvepSimulator {
    params: SyntheticParams,
    rng: StdRng,
    sample_index: u64,
}

impl SsvepSimulator {
    /// Create a generator with a fixed seed
    #[must_use]
    pub fn new(params: SyntheticParams, seed: u64) -> Self {
        Self { params, rng: StdRng::seed_from_u64(seed), sample_index: 0 }
    }

    /// Generator parameters
    #[must_use]
    pub fn params(&self) -> &SyntheticParams {
        &self.params
    }

    /// Samples produced so far
    #[must_use]
    pub fn samples_generated(&self) -> u64 {
        self.sample_index
    }

    /// Index into `frequencies` attended at the current sample
    #[must_use]
    pub fn attended(&self) -> Option<usize> {
        let n = self.params.frequencies.len();
        if n == 0 || self.params.segment_secs <= 0.0 {
            return None;
        }
        let t = self.sample_index as f64 / self.params.sample_rate;
        Some((t / self.params.segment_secs) as usize % n)
    }

    /// Frequency attended at the current sample
    #[must_use]
    pub fn attended_frequency(&self) -> Option<f64> {
        self.attended().map(|i| self.params.frequencies[i])
    }

    /// Produce the next sample for every channel
    pub fn next_sample(&mut self) -> Vec<f64> {
        let t = self.sample_index as f64 / self.params.sample_rate;
        let ssvep = self.attended_frequency().map_or(0.0, |f| {
            self.params.signal_uv
                * ((2.0 * PI * f * t).sin() + self.params.harmonic_ratio * (2.0 * PI * 2.0 * f * t).sin())
        });

        let mut sample = Vec::with_capacity(self.params.channel_count);
        for ch in 0..self.params.channel_count {
            let mut v = self.gaussian_noise() * self.params.noise_uv;
            if self.params.signal_channels.contains(&ch) {
                v += ssvep;
            }
            sample.push(v);
        }

        self.sample_index += 1;
        sample
    }

    /// Produce `n` samples as channels × samples
    pub fn generate(&mut self, n: usize) -> Vec<Vec<f64>> {
        let mut data = vec![Vec::with_capacity(n); self.params.channel_count];
        for _ in 0..n {
            for (row, v) in data.iter_mut().zip(self.next_sample()) {
                row.push(v);
            }
        }
        data
    }

    fn gaussian_noise(&mut self) -> f64 {
        // Box-Muller transform
        let u1: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
        let u2: f64 = self.rng.gen();

        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmaze_core::math;

    #[test]
    fn test_segments_cycle() {
        let params = SyntheticParams { segment_secs: 1.0, ..SyntheticParams::default() };
        let mut sim = SsvepSimulator::new(params, 0);
        assert_eq!(sim.attended_frequency(), Some(5.0));
        sim.generate(250);
        assert_eq!(sim.attended_frequency(), Some(10.0));
        sim.generate(750);
        assert_eq!(sim.attended_frequency(), Some(5.0));
        assert_eq!(sim.samples_generated(), 1000);
    }

    #[test]
    fn test_noise_level() {
        let params = SyntheticParams { signal_uv: 0.0, ..SyntheticParams::default() };
        let data = SsvepSimulator::new(params, 4).generate(5000);
        assert_eq!(data.len(), 8);
        let sd = math::std_dev(&data[0]);
        assert!((sd - 10.0).abs() < 1.0, "sd {sd}");
        assert!(math::mean(&data[0]).abs() < 1.0);
    }

    #[test]
    fn test_signal_only_on_occipital_channels() {
        let params = SyntheticParams {
            noise_uv: 0.0,
            frequencies: vec![10.0],
            ..SyntheticParams::default()
        };
        let data = SsvepSimulator::new(params, 1).generate(500);
        assert!(data[0].iter().all(|&v| v == 0.0));
        assert!(math::std_dev(&data[6]) > 2.0);
        assert_eq!(data[6], data[7]);
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = SsvepSimulator::new(SyntheticParams::default(), 42).generate(100);
        let b = SsvepSimulator::new(SyntheticParams::default(), 42).generate(100);
        assert_eq!(a, b);
    }
}
