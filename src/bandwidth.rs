//! Bandwidth estimation for the flat kernel.
//!
//! The bandwidth is the mean, over every row, of the distance to that row's
//! `knn`-th nearest neighbor, where `knn = floor(n * quantile)`. Each row is an
//! independent unit of work, so rows are fanned out on the worker pool and
//! the per-row values are summed afterwards.

use crate::error::{MeanShiftError, Result};
use crate::matrix::DistanceMatrix;
use crate::parallel::ParallelMap;
use tracing::debug;

/// Check that `quantile` is a finite value in `[0, 1]`.
pub fn validate_quantile(quantile: f32) -> Result<()> {
    if !quantile.is_finite() || !(0.0..=1.0).contains(&quantile) {
        return Err(MeanShiftError::invalid_parameter(format!(
            "quantile must be in [0, 1], got {}",
            quantile
        )));
    }
    Ok(())
}

/// Number of neighbors used for a matrix of `n` rows: `floor(n * quantile)`.
pub fn knn_for(n: usize, quantile: f32) -> usize {
    (n as f64 * quantile as f64).floor() as usize
}

/// Estimate the bandwidth of `matrix` for the given quantile.
///
/// # Errors
/// - `EmptyMatrix` if the matrix has no rows
/// - `InvalidParameter` if the matrix is not square, or the quantile is
///   outside `[0, 1]` or selects `knn == 0`
/// - any error raised by a row query or the worker pool
pub fn estimate_bandwidth<M>(matrix: &M, quantile: f32, pool: &ParallelMap) -> Result<f32>
where
    M: DistanceMatrix + ?Sized,
{
    validate_quantile(quantile)?;
    matrix.ensure_square()?;

    let n = matrix.rows();
    if n == 0 {
        return Err(MeanShiftError::EmptyMatrix);
    }

    let knn = knn_for(n, quantile);
    if knn == 0 {
        return Err(MeanShiftError::invalid_parameter(format!(
            "quantile {} selects the 0-th neighbor for {} points; use at least {}",
            quantile,
            n,
            1.0 / n as f64
        )));
    }

    let per_row = pool.map_range(0..n, |i| matrix.kth_smallest_in_row(i, knn))?;
    let sum: f64 = per_row.iter().map(|&d| d as f64).sum();
    let bandwidth = (sum / n as f64) as f32;

    debug!(n, knn, quantile, bandwidth, "bandwidth estimated");
    Ok(bandwidth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DenseMatrix;
    use crate::parallel::PoolSize;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn line(positions: &[f32]) -> DenseMatrix {
        let rows = positions
            .iter()
            .map(|a| positions.iter().map(|b| (a - b).abs()).collect())
            .collect();
        DenseMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_mean_of_kth_distances() {
        let m = line(&[0.0, 1.0, 2.0, 100.0, 101.0, 102.0]);
        // knn = 3: rows give 2, 1, 2, 2, 1, 2
        let bw = estimate_bandwidth(&m, 0.5, &ParallelMap::sequential()).unwrap();
        assert!((bw - 10.0 / 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_full_quantile_uses_row_maximum() {
        let m = line(&[0.0, 1.0, 3.0]);
        // knn = 3: maxima are 3, 2, 3
        let bw = estimate_bandwidth(&m, 1.0, &ParallelMap::sequential()).unwrap();
        assert!((bw - 8.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_parallel_agrees_with_sequential() {
        let mut rng = StdRng::seed_from_u64(11);
        let m = DenseMatrix::random_symmetric(200, &mut rng);

        let seq = estimate_bandwidth(&m, 0.3, &ParallelMap::sequential()).unwrap();
        let par = estimate_bandwidth(&m, 0.3, &ParallelMap::new(PoolSize::Fixed(4)).unwrap())
            .unwrap();
        let global = estimate_bandwidth(&m, 0.3, &ParallelMap::global()).unwrap();

        assert!(seq >= 0.0);
        assert!((seq - par).abs() < 1e-5);
        assert!((seq - global).abs() < 1e-5);
    }

    #[test]
    fn test_zero_knn_rejected() {
        let m = line(&[0.0, 1.0, 2.0]);
        let err = estimate_bandwidth(&m, 0.2, &ParallelMap::sequential()).unwrap_err();
        assert!(matches!(err, MeanShiftError::InvalidParameter(_)));
    }

    #[test]
    fn test_bad_quantile_rejected() {
        let m = line(&[0.0, 1.0]);
        let pool = ParallelMap::sequential();
        assert!(estimate_bandwidth(&m, 1.5, &pool).is_err());
        assert!(estimate_bandwidth(&m, -0.1, &pool).is_err());
        assert!(estimate_bandwidth(&m, f32::NAN, &pool).is_err());
    }

    #[test]
    fn test_non_square_matrix_rejected() {
        let m = DenseMatrix::from_rows(vec![vec![0.0, 1.0, 2.0], vec![1.0, 0.0, 1.0]]).unwrap();
        let err = estimate_bandwidth(&m, 0.5, &ParallelMap::sequential()).unwrap_err();
        assert!(matches!(err, MeanShiftError::InvalidParameter(_)));
    }

    #[test]
    fn test_empty_matrix_rejected() {
        let m = DenseMatrix::new(0, 0);
        let err = estimate_bandwidth(&m, 0.5, &ParallelMap::sequential()).unwrap_err();
        assert!(matches!(err, MeanShiftError::EmptyMatrix));
    }

    #[test]
    fn test_single_point_has_zero_bandwidth() {
        let m = DenseMatrix::new(1, 1);
        let bw = estimate_bandwidth(&m, 1.0, &ParallelMap::sequential()).unwrap();
        assert_eq!(bw, 0.0);
    }

    #[test]
    fn test_knn_for() {
        assert_eq!(knn_for(10, 0.3), 3);
        assert_eq!(knn_for(6, 0.5), 3);
        assert_eq!(knn_for(1, 0.99), 0);
        assert_eq!(knn_for(7, 1.0), 7);
    }
}
