//! Canonical correlation analysis
//!
//! Only the first canonical correlation is needed for SSVEP scoring. It is the
//! cosine of the smallest principal angle between the column spaces of the two
//! blocks, which is the largest singular value of `Ux^T Uy` where `Ux` and `Uy`
//! are orthonormal bases of the (standardized) blocks.

use nalgebra::DMatrix;

use mindmaze_core::{math, ProcessingError};

/// Minimum rows (samples) for a meaningful correlation
pub const MIN_ROWS: usize = 10;

/// SVD sweeps allowed before a block is reported as not converging
pub const MAX_SVD_ITERATIONS: usize = 10_000;

/// Relative singular value, against a unit-variance column of the same
/// length, below which a direction counts as rounding noise
const RANK_RTOL: f64 = 1e-8;

/// Scale every column to zero mean and unit variance (population).
///
/// Columns that are constant up to rounding are set to exactly zero.
pub fn standardize_columns(block: &mut DMatrix<f64>) {
    let n = block.nrows();
    if n == 0 {
        return;
    }
    for mut col in block.column_iter_mut() {
        let values: Vec<f64> = col.iter().copied().collect();
        if math::is_constant(&values) {
            col.fill(0.0);
            continue;
        }
        let mean = math::mean(&values);
        let sd = math::std_dev(&values);
        for v in col.iter_mut() {
            *v = (*v - mean) / sd;
        }
    }
}

/// First canonical correlation between `x` (n×p) and `y` (n×q).
///
/// Both blocks are expected to be standardized already. Directions with
/// singular values below the numerical rank tolerance are dropped, so
/// collinear or constant columns do not inflate the result.
///
/// # Errors
///
/// [`ProcessingError::ShapeMismatch`] when the row counts differ,
/// [`ProcessingError::InsufficientData`] below [`MIN_ROWS`] rows,
/// [`ProcessingError::NonFinite`] for NaN or infinite entries and
/// [`ProcessingError::NoConvergence`] if an SVD hits
/// [`MAX_SVD_ITERATIONS`].
pub fn canonical_correlation(x: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<f64, ProcessingError> {
    if x.nrows() != y.nrows() {
        return Err(ProcessingError::ShapeMismatch { left_rows: x.nrows(), right_rows: y.nrows() });
    }
    if x.nrows() < MIN_ROWS {
        return Err(ProcessingError::InsufficientData { available: x.nrows(), required: MIN_ROWS });
    }

    check_finite(x)?;
    check_finite(y)?;

    let (Some(ux), Some(uy)) = (orthonormal_basis(x)?, orthonormal_basis(y)?) else {
        return Ok(0.0);
    };

    let m = ux.transpose() * uy;
    let svd = m
        .try_svd(false, false, f64::EPSILON, MAX_SVD_ITERATIONS)
        .ok_or(ProcessingError::NoConvergence)?;
    let rho = svd.singular_values.iter().copied().fold(0.0_f64, f64::max);
    Ok(rho.clamp(0.0, 1.0))
}

fn check_finite(block: &DMatrix<f64>) -> Result<(), ProcessingError> {
    match block.iter().position(|v| !v.is_finite()) {
        // Column-major: position = column * nrows + row
        Some(i) => Err(ProcessingError::NonFinite { channel: i / block.nrows(), sample: i % block.nrows() }),
        None => Ok(()),
    }
}

/// Orthonormal basis of the column space, or `None` for a rank-0 block.
///
/// A standardized column has norm `sqrt(n)`, so the rank tolerance is
/// scaled to that rather than to the largest singular value; a block of
/// rounding residue then has rank zero instead of a basis of noise.
fn orthonormal_basis(block: &DMatrix<f64>) -> Result<Option<DMatrix<f64>>, ProcessingError> {
    if block.ncols() == 0 {
        return Ok(None);
    }
    let svd = block
        .clone()
        .try_svd(true, false, f64::EPSILON, MAX_SVD_ITERATIONS)
        .ok_or(ProcessingError::NoConvergence)?;
    let Some(u) = svd.u else {
        return Ok(None);
    };
    let sv = &svd.singular_values;

    let max_sv = sv.iter().copied().fold(0.0_f64, f64::max);
    let relative = max_sv * block.nrows().max(block.ncols()) as f64 * f64::EPSILON;
    let tol = relative.max((block.nrows() as f64).sqrt() * RANK_RTOL);
    let keep: Vec<usize> = (0..sv.len()).filter(|&i| sv[i] > tol).collect();
    if keep.is_empty() {
        return Ok(None);
    }
    Ok(Some(u.select_columns(keep.iter())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    fn noise(rng: &mut StdRng, n: usize, cols: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, cols, |_, _| rng.gen_range(-1.0..1.0))
    }

    #[test]
    fn test_standardize_columns() {
        let mut m = DMatrix::from_row_slice(4, 2, &[1.0, 5.0, 2.0, 5.0, 3.0, 5.0, 4.0, 5.0]);
        standardize_columns(&mut m);
        let c0 = m.column(0);
        assert!(c0.sum().abs() < 1e-12);
        assert!((c0.norm_squared() / 4.0 - 1.0).abs() < 1e-12);
        // Constant column collapses to zero
        assert!(m.column(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_identical_blocks_correlate_fully() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut x = noise(&mut rng, 200, 3);
        standardize_columns(&mut x);
        let rho = canonical_correlation(&x, &x).unwrap();
        assert!((rho - 1.0).abs() < 1e-9, "rho {rho}");
    }

    #[test]
    fn test_linear_mix_is_found() {
        let n = 500;
        let mut rng = StdRng::seed_from_u64(11);
        let mut y = DMatrix::from_fn(n, 2, |r, c| {
            let t = r as f64 / 250.0;
            if c == 0 { (2.0 * PI * 10.0 * t).sin() } else { (2.0 * PI * 10.0 * t).cos() }
        });
        // x0 is a phase-shifted 10 Hz sine, x1 unrelated noise
        let mut x = DMatrix::from_fn(n, 2, |r, c| {
            let t = r as f64 / 250.0;
            if c == 0 { (2.0 * PI * 10.0 * t + 0.7).sin() } else { 0.0 }
        });
        for r in 0..n {
            x[(r, 1)] = rng.gen_range(-1.0..1.0);
        }
        standardize_columns(&mut x);
        standardize_columns(&mut y);
        let rho = canonical_correlation(&x, &y).unwrap();
        assert!(rho > 0.99, "rho {rho}");
    }

    #[test]
    fn test_independent_noise_is_low() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut x = noise(&mut rng, 1000, 3);
        let mut y = noise(&mut rng, 1000, 4);
        standardize_columns(&mut x);
        standardize_columns(&mut y);
        let rho = canonical_correlation(&x, &y).unwrap();
        assert!((0.0..0.3).contains(&rho), "rho {rho}");
    }

    #[test]
    fn test_rank_zero_block_scores_zero() {
        let mut rng = StdRng::seed_from_u64(9);
        let x = DMatrix::zeros(50, 3);
        let mut y = noise(&mut rng, 50, 4);
        standardize_columns(&mut y);
        assert_eq!(canonical_correlation(&x, &y).unwrap(), 0.0);
    }

    #[test]
    fn test_rounding_residue_scores_zero() {
        let mut rng = StdRng::seed_from_u64(4);
        // Far below a unit-variance column, so no direction is kept
        let x = DMatrix::from_fn(500, 3, |r, c| 1e-17 * ((r * (c + 2)) % 7) as f64);
        let mut y = noise(&mut rng, 500, 4);
        standardize_columns(&mut y);
        assert_eq!(canonical_correlation(&x, &y).unwrap(), 0.0);
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut x = DMatrix::from_fn(100, 3, |r, c| (r + c) as f64);
        let y = DMatrix::from_fn(100, 2, |r, _| r as f64);
        x[(40, 2)] = f64::NAN;
        assert_eq!(
            canonical_correlation(&x, &y),
            Err(ProcessingError::NonFinite { channel: 2, sample: 40 })
        );
        x[(40, 2)] = f64::INFINITY;
        assert!(canonical_correlation(&x, &y).is_err());
    }

    #[test]
    fn test_shape_errors() {
        let x = DMatrix::zeros(20, 2);
        let y = DMatrix::zeros(19, 2);
        assert_eq!(
            canonical_correlation(&x, &y),
            Err(ProcessingError::ShapeMismatch { left_rows: 20, right_rows: 19 })
        );
        let x = DMatrix::zeros(5, 2);
        assert_eq!(
            canonical_correlation(&x, &x),
            Err(ProcessingError::InsufficientData { available: 5, required: MIN_ROWS })
        );
    }
}
