//! Mean-shift clustering with a flat kernel over a precomputed distance matrix.
//!
//! # Algorithm Overview
//!
//! 1. Estimate the bandwidth from the matrix (see [`crate::bandwidth`]).
//! 2. Climb every seed to a mode in parallel (see [`crate::convergence`]),
//!    recording each mode with the size of its final neighborhood.
//! 3. Remove near-duplicate modes: walk the modes by descending intensity and
//!    let every surviving mode absorb the lower-ranked modes within the
//!    bandwidth.
//!
//! The neighbor cache and the intensity map belong to a single run and are
//! dropped when it returns.

use crate::bandwidth::estimate_bandwidth;
use crate::config::MeanShiftConfig;
use crate::constants::meanshift::STOP_THRESHOLD_FACTOR;
use crate::convergence::{HillClimber, Mode};
use crate::error::{MeanShiftError, Result};
use crate::matrix::DistanceMatrix;
use crate::metrics::{RunStatistics, RunStatsBuilder};
use crate::neighborhood::NeighborhoodIndex;
use crate::parallel::ParallelMap;
use crate::seeds::SeedSelection;
use crate::stats::keys_sorted_by_value;
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// A cluster center and its intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Center {
    /// Point index of the center.
    pub index: usize,
    /// Neighborhood size recorded when a climb converged here.
    pub intensity: usize,
}

/// The outcome of a clustering run.
#[derive(Debug, Clone, Serialize)]
pub struct Clustering {
    /// Unique centers, highest intensity first.
    pub centers: Vec<Center>,
    /// Bandwidth used by the run.
    pub bandwidth: f32,
    /// Timing and counters for the run.
    pub stats: RunStatistics,
}

impl Clustering {
    /// Center indices in intensity order.
    pub fn indices(&self) -> Vec<usize> {
        self.centers.iter().map(|c| c.index).collect()
    }

    /// Center indices in ascending index order.
    pub fn sorted_indices(&self) -> Vec<usize> {
        let mut indices = self.indices();
        indices.sort_unstable();
        indices
    }

    /// Number of clusters found.
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    /// Return true if no cluster was found.
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}

/// Mode intensities written concurrently by the convergence workers.
///
/// When several seeds reach the same center the largest intensity is kept,
/// so the final map does not depend on which seed finished first.
#[derive(Default)]
struct IntensityMap {
    inner: Mutex<HashMap<usize, usize>>,
}

impl IntensityMap {
    fn record(&self, mode: Mode) {
        self.inner
            .lock()
            .entry(mode.center)
            .and_modify(|i| *i = (*i).max(mode.intensity))
            .or_insert(mode.intensity);
    }

    fn into_inner(self) -> HashMap<usize, usize> {
        self.inner.into_inner()
    }
}

/// Flat-kernel mean-shift clusterer.
///
/// # Example
///
/// ```
/// use forge_meanshift::{DenseMatrix, MeanShift, MeanShiftConfig};
///
/// let positions = [0.0f32, 1.0, 2.0, 100.0, 101.0, 102.0];
/// let rows = positions
///     .iter()
///     .map(|a| positions.iter().map(|b| (a - b).abs()).collect())
///     .collect();
/// let matrix = DenseMatrix::from_rows(rows)?;
///
/// let clustering = MeanShift::new(MeanShiftConfig::default().with_quantile(0.5))
///     .cluster(&matrix)?;
/// assert_eq!(clustering.sorted_indices(), vec![1, 4]);
/// # Ok::<(), forge_meanshift::MeanShiftError>(())
/// ```
pub struct MeanShift {
    config: MeanShiftConfig,
}

impl MeanShift {
    /// Create a clusterer with the given configuration.
    pub fn new(config: MeanShiftConfig) -> Self {
        Self { config }
    }

    /// The configuration of this clusterer.
    pub fn config(&self) -> &MeanShiftConfig {
        &self.config
    }

    /// Cluster `matrix`, sampling seeds with the thread-local RNG if the
    /// configuration asks for a sample.
    pub fn cluster<M>(&self, matrix: &M) -> Result<Clustering>
    where
        M: DistanceMatrix + ?Sized,
    {
        self.cluster_with_rng(matrix, &mut rand::thread_rng())
    }

    /// Cluster `matrix`, drawing any seed sample from `rng`.
    ///
    /// # Errors
    /// - `InvalidParameter` for a bad configuration, a non-square matrix, bad
    ///   explicit seeds, or a quantile that selects the 0-th neighbor
    /// - `NonTerminating` if the bandwidth is not positive and
    ///   `max_iterations == 0`
    /// - `ThreadPool` / `TaskFailed` if the worker pool fails
    #[instrument(skip_all, fields(points = matrix.rows()))]
    pub fn cluster_with_rng<M, R>(&self, matrix: &M, rng: &mut R) -> Result<Clustering>
    where
        M: DistanceMatrix + ?Sized,
        R: Rng + ?Sized,
    {
        self.config.validate()?;
        matrix.ensure_square()?;
        let seeds = self.config.seeds.resolve(matrix.rows(), rng)?;
        let pool = ParallelMap::new(self.config.pool)?;
        self.run(matrix, &seeds, &pool)
    }

    fn run<M>(&self, matrix: &M, seeds: &[usize], pool: &ParallelMap) -> Result<Clustering>
    where
        M: DistanceMatrix + ?Sized,
    {
        let n = matrix.rows();
        let mut stats = RunStatsBuilder::new();
        stats.points(n, seeds.len());

        if n == 0 {
            return Ok(Clustering {
                centers: Vec::new(),
                bandwidth: 0.0,
                stats: stats.build(),
            });
        }

        let start = Instant::now();
        let (bandwidth, estimated) = match self.config.bandwidth {
            Some(bandwidth) => (bandwidth, false),
            None => (estimate_bandwidth(matrix, self.config.quantile, pool)?, true),
        };
        stats.bandwidth(bandwidth, estimated, start.elapsed());
        info!(bandwidth, elapsed = ?start.elapsed(), "bandwidth ready");

        if bandwidth <= 0.0 && self.config.max_iterations == 0 {
            return Err(MeanShiftError::NonTerminating { bandwidth });
        }

        let index = NeighborhoodIndex::new(matrix, bandwidth);

        let start = Instant::now();
        let intensities = IntensityMap::default();
        let iterations = AtomicUsize::new(0);
        let without_center = AtomicUsize::new(0);
        {
            let climber = HillClimber::new(
                &index,
                self.config.max_iterations,
                STOP_THRESHOLD_FACTOR * bandwidth,
            );
            pool.for_each(seeds, |&seed| {
                match climber.climb(seed) {
                    Some(mode) => {
                        iterations.fetch_add(mode.iterations, Ordering::Relaxed);
                        intensities.record(mode);
                    }
                    None => {
                        without_center.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Ok(())
            })?;
        }
        let intensities = intensities.into_inner();
        stats.convergence(
            start.elapsed(),
            iterations.into_inner(),
            without_center.into_inner(),
        );
        info!(
            seeds = seeds.len(),
            modes = intensities.len(),
            elapsed = ?start.elapsed(),
            "convergence finished"
        );

        let start = Instant::now();
        let centers = deduplicate(&index, &intensities);
        stats.dedup(start.elapsed(), intensities.len(), centers.len());
        stats.cache(index.cached_len(), index.computations());
        info!(
            centers = centers.len(),
            elapsed = ?start.elapsed(),
            "post processing finished"
        );

        Ok(Clustering {
            centers,
            bandwidth,
            stats: stats.build(),
        })
    }
}

/// Keep the highest-intensity representative of every group of modes that
/// lie within the index radius of each other.
///
/// Modes are ranked by descending intensity, ties by ascending index. Each
/// mode still marked unique marks every lower-ranked mode within the radius
/// as a duplicate; a mode never removes itself.
pub fn deduplicate<M>(index: &NeighborhoodIndex<'_, M>, intensities: &HashMap<usize, usize>) -> Vec<Center>
where
    M: DistanceMatrix + ?Sized,
{
    let sorted = keys_sorted_by_value(intensities, true);
    let mut unique = vec![true; sorted.len()];

    for i in 0..sorted.len() {
        if !unique[i] {
            continue;
        }
        let later = &sorted[i + 1..];
        for pos in index.positions_within(sorted[i], later) {
            unique[i + 1 + pos] = false;
        }
    }

    let centers: Vec<Center> = sorted
        .iter()
        .zip(&unique)
        .filter(|(_, &keep)| keep)
        .map(|(&c, _)| Center {
            index: c,
            intensity: intensities[&c],
        })
        .collect();

    debug!(
        discovered = sorted.len(),
        unique = centers.len(),
        "near-duplicate centers removed"
    );
    centers
}

/// Cluster `matrix` and return the center indices, highest intensity first.
///
/// Shorthand for [`MeanShift::cluster`] with the default worker pool.
pub fn cluster<M>(
    matrix: &M,
    seeds: SeedSelection,
    quantile: f32,
    max_iterations: usize,
) -> Result<Vec<usize>>
where
    M: DistanceMatrix + ?Sized,
{
    let config = MeanShiftConfig::default()
        .with_seeds(seeds)
        .with_quantile(quantile)
        .with_max_iterations(max_iterations);
    Ok(MeanShift::new(config).cluster(matrix)?.indices())
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

    fn uniform(n: usize, d: f32) -> DenseMatrix {
        let rows = (0..n)
            .map(|i| (0..n).map(|j| if i == j { 0.0 } else { d }).collect())
            .collect();
        DenseMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_two_clusters() {
        let m = line(&[0.0, 1.0, 2.0, 100.0, 101.0, 102.0]);
        let clustering = MeanShift::new(MeanShiftConfig::default().with_quantile(0.5))
            .cluster(&m)
            .unwrap();

        assert!((clustering.bandwidth - 10.0 / 6.0).abs() < 1e-5);
        assert_eq!(clustering.sorted_indices(), vec![1, 4]);
        assert!(clustering.centers.iter().all(|c| c.intensity == 3));
        assert_eq!(clustering.stats.discovered_centers, 4);
        assert_eq!(clustering.stats.unique_centers, 2);
    }

    #[test]
    fn test_single_point() {
        let m = DenseMatrix::new(1, 1);
        for max_iterations in [1, 5, 300] {
            let config = MeanShiftConfig::default()
                .with_quantile(1.0)
                .with_max_iterations(max_iterations);
            let clustering = MeanShift::new(config).cluster(&m).unwrap();
            assert_eq!(clustering.indices(), vec![0]);
            assert_eq!(clustering.bandwidth, 0.0);
        }
    }

    #[test]
    fn test_single_point_zero_iterations_rejected() {
        let m = DenseMatrix::new(1, 1);
        let config = MeanShiftConfig::default()
            .with_quantile(1.0)
            .with_max_iterations(0);
        let err = MeanShift::new(config).cluster(&m).unwrap_err();
        assert!(matches!(err, MeanShiftError::NonTerminating { .. }));
    }

    #[test]
    fn test_equidistant_points_collapse() {
        let m = uniform(8, 5.0);
        let config = MeanShiftConfig::default().with_bandwidth(6.0);
        let clustering = MeanShift::new(config).cluster(&m).unwrap();

        assert_eq!(clustering.len(), 1);
        assert_eq!(clustering.centers[0].intensity, 8);
    }

    #[test]
    fn test_all_zero_distances_collapse() {
        let m = DenseMatrix::new(5, 5);
        let config = MeanShiftConfig::default()
            .with_quantile(0.6)
            .with_max_iterations(3);
        let clustering = MeanShift::new(config).cluster(&m).unwrap();

        assert_eq!(clustering.bandwidth, 0.0);
        assert_eq!(clustering.len(), 1);
    }

    #[test]
    fn test_empty_seed_set() {
        let m = line(&[0.0, 1.0, 2.0]);
        let config = MeanShiftConfig::default()
            .with_quantile(0.5)
            .with_seeds(SeedSelection::Explicit(Vec::new()));
        let clustering = MeanShift::new(config).cluster(&m).unwrap();
        assert!(clustering.is_empty());
    }

    #[test]
    fn test_empty_matrix() {
        let m = DenseMatrix::new(0, 0);
        let clustering = MeanShift::new(MeanShiftConfig::default()).cluster(&m).unwrap();
        assert!(clustering.is_empty());
    }

    #[test]
    fn test_non_square_matrix_rejected() {
        let m = DenseMatrix::from_rows(vec![vec![0.0, 1.0, 2.0], vec![1.0, 0.0, 1.0]]).unwrap();
        for pool in [PoolSize::Sequential, PoolSize::Fixed(2)] {
            let config = MeanShiftConfig::default().with_bandwidth(1.5).with_pool(pool);
            let err = MeanShift::new(config).cluster(&m).unwrap_err();
            assert!(matches!(err, MeanShiftError::InvalidParameter(_)));
        }
    }

    #[test]
    fn test_explicit_seed_reaches_unseeded_mean() {
        let m = line(&[0.0, 1.0, 2.0, 100.0, 101.0, 102.0]);
        let config = MeanShiftConfig::default()
            .with_quantile(0.5)
            .with_seeds(SeedSelection::Explicit(vec![2, 5]));
        let clustering = MeanShift::new(config).cluster(&m).unwrap();

        // neither 1 nor 4 was a seed, but both are reached by climbing
        assert_eq!(clustering.sorted_indices(), vec![1, 4]);
        assert!(clustering.stats.cached_neighborhoods >= 4);
    }

    #[test]
    fn test_sampled_seeds_with_injected_rng() {
        let m = line(&[0.0, 1.0, 2.0, 100.0, 101.0, 102.0]);
        let config = MeanShiftConfig::default()
            .with_quantile(0.5)
            .with_seeds(SeedSelection::Sample(3));
        let engine = MeanShift::new(config);

        let a = engine
            .cluster_with_rng(&m, &mut StdRng::seed_from_u64(5))
            .unwrap();
        let b = engine
            .cluster_with_rng(&m, &mut StdRng::seed_from_u64(5))
            .unwrap();
        assert_eq!(a.stats.num_seeds, 3);
        assert_eq!(a.indices(), b.indices());
        assert!(a.sorted_indices().iter().all(|c| [0, 1, 4, 3].contains(c)));
    }

    #[test]
    fn test_pool_size_does_not_change_result() {
        let m = line(&[0.0, 0.5, 1.0, 1.5, 50.0, 50.5, 51.0, 90.0, 90.4, 90.8]);
        let base = MeanShiftConfig::default().with_quantile(0.3);

        let results: Vec<Vec<usize>> = [PoolSize::Sequential, PoolSize::Fixed(1), PoolSize::Fixed(4)]
            .into_iter()
            .map(|pool| {
                MeanShift::new(base.clone().with_pool(pool))
                    .cluster(&m)
                    .unwrap()
                    .sorted_indices()
            })
            .collect();

        assert_eq!(results[0], results[1]);
        assert_eq!(results[0], results[2]);
    }

    #[test]
    fn test_deduplicate_keeps_highest_intensity() {
        let m = line(&[0.0, 1.0, 2.0, 10.0]);
        let index = NeighborhoodIndex::new(&m, 1.5);
        let intensities: HashMap<usize, usize> = [(0, 2), (1, 5), (2, 1), (3, 4)].into_iter().collect();

        let centers = deduplicate(&index, &intensities);
        assert_eq!(
            centers,
            vec![
                Center { index: 1, intensity: 5 },
                Center { index: 3, intensity: 4 },
            ]
        );
    }

    #[test]
    fn test_deduplicate_chain_is_greedy() {
        // 0 absorbs 1; 2 is within range of 1 but not of 0, so it survives
        let m = line(&[0.0, 1.0, 2.0]);
        let index = NeighborhoodIndex::new(&m, 1.5);
        let intensities: HashMap<usize, usize> = [(0, 3), (1, 2), (2, 1)].into_iter().collect();

        let indices: Vec<usize> = deduplicate(&index, &intensities)
            .into_iter()
            .map(|c| c.index)
            .collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_intensity_map_keeps_max() {
        let map = IntensityMap::default();
        map.record(Mode { center: 3, intensity: 2, iterations: 0 });
        map.record(Mode { center: 3, intensity: 7, iterations: 4 });
        map.record(Mode { center: 3, intensity: 5, iterations: 1 });
        map.record(Mode { center: 1, intensity: 1, iterations: 0 });

        let map = map.into_inner();
        assert_eq!(map[&3], 7);
        assert_eq!(map[&1], 1);
    }

    #[test]
    fn test_cluster_shorthand() {
        let m = line(&[0.0, 1.0, 2.0, 100.0, 101.0, 102.0]);
        let mut centers = cluster(&m, SeedSelection::All, 0.5, 300).unwrap();
        centers.sort_unstable();
        assert_eq!(centers, vec![1, 4]);
    }
}
