//! Math utilities for SSVEP processing (`no_std` compatible)
//!
//! This module provides:
//! - Column statistics (mean, population standard deviation)
//! - In-place standardization and DC offset removal
//! - Pearson correlation
//! - Sine/cosine reference waveforms at a stimulus frequency and its harmonic

use core::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Arithmetic mean. Returns 0 for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (ddof = 0). Returns 0 for an empty slice.
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    libm::sqrt(var)
}

/// True when the values carry no variance beyond floating-point rounding.
///
/// The bound grows with the mean and the sample count, so a flat line at a
/// large offset is still recognised after its rounding residue is summed.
#[must_use]
pub fn is_constant(values: &[f64]) -> bool {
    if values.is_empty() {
        return true;
    }
    let n = values.len() as f64;
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n;
    let bound = n * f64::EPSILON * var + (n * m * f64::EPSILON) * (n * m * f64::EPSILON);
    var <= bound
}

/// Subtract the mean from every value.
pub fn remove_dc_offset(values: &mut [f64]) {
    let m = mean(values);
    for v in values.iter_mut() {
        *v -= m;
    }
}

/// Scale to zero mean and unit variance.
///
/// A constant input (see [`is_constant`]) is set to exactly zero.
pub fn standardize(values: &mut [f64]) {
    if is_constant(values) {
        values.fill(0.0);
        return;
    }
    let m = mean(values);
    let sd = std_dev(values);
    for v in values.iter_mut() {
        *v = (*v - m) / sd;
    }
}

/// Pearson correlation coefficient.
///
/// Returns 0 when either input has zero variance or the lengths differ.
#[must_use]
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let ma = mean(a);
    let mb = mean(b);

    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x - ma;
        let dy = y - mb;
        cov += dx * dy;
        va += dx * dx;
        vb += dy * dy;
    }

    let denom = libm::sqrt(va * vb);
    if denom <= f64::EPSILON {
        0.0
    } else {
        (cov / denom).clamp(-1.0, 1.0)
    }
}

// ============================================================================
// SSVEP Reference Waveforms
// ============================================================================

/// One column of an SSVEP reference block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceComponent {
    /// sin(2π f t)
    SinFundamental,
    /// cos(2π f t)
    CosFundamental,
    /// sin(2π 2f t)
    SinHarmonic,
    /// cos(2π 2f t)
    CosHarmonic,
}

impl ReferenceComponent {
    /// Column order of a reference block
    pub const ALL: [Self; 4] = [
        Self::SinFundamental,
        Self::CosFundamental,
        Self::SinHarmonic,
        Self::CosHarmonic,
    ];

    /// Evaluate the component at time `t` seconds for stimulus frequency `freq_hz`.
    #[inline]
    #[must_use]
    pub fn value(self, freq_hz: f64, t: f64) -> f64 {
        match self {
            Self::SinFundamental => libm::sin(2.0 * PI * freq_hz * t),
            Self::CosFundamental => libm::cos(2.0 * PI * freq_hz * t),
            Self::SinHarmonic => libm::sin(2.0 * PI * 2.0 * freq_hz * t),
            Self::CosHarmonic => libm::cos(2.0 * PI * 2.0 * freq_hz * t),
        }
    }
}
