//! Statistics collected during a clustering run.
//!
//! Use [`RunStatistics`] to see where a run spent its time and how much work
//! the neighbor cache saved:
//!
//! ```ignore
//! let clustering = MeanShift::new(config).cluster(&matrix)?;
//! println!("{}", clustering.stats.summary());
//! // Output:
//! // RunStatistics:
//! //   Points: 1000, Seeds: 1000 (0 without center)
//! //   Bandwidth: 0.412 (estimated in 3.104ms)
//! //   ...
//! ```

use serde::Serialize;
use std::time::Duration;

/// Statistics about one clustering run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunStatistics {
    /// Number of points in the matrix.
    pub num_points: usize,
    /// Number of seeds climbed.
    pub num_seeds: usize,
    /// Bandwidth used for the run.
    pub bandwidth: f32,
    /// Whether the bandwidth was estimated (false when given explicitly).
    pub bandwidth_estimated: bool,
    /// Time spent estimating the bandwidth.
    pub bandwidth_time: Duration,
    /// Time spent climbing all seeds.
    pub convergence_time: Duration,
    /// Time spent removing near-duplicate centers.
    pub dedup_time: Duration,
    /// Seeds whose climb hit an empty neighborhood.
    pub seeds_without_center: usize,
    /// Iterations completed across all climbs.
    pub total_iterations: usize,
    /// Distinct centers reached before deduplication.
    pub discovered_centers: usize,
    /// Centers left after deduplication.
    pub unique_centers: usize,
    /// Neighbor lists held in the cache at the end of the run.
    pub cached_neighborhoods: usize,
    /// Neighbor lists computed, including ones lost to a race.
    pub neighborhood_computations: usize,
}

impl RunStatistics {
    /// Total time across all phases.
    pub fn total_time(&self) -> Duration {
        self.bandwidth_time + self.convergence_time + self.dedup_time
    }

    /// Create a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "RunStatistics:\n  \
             Points: {}, Seeds: {} ({} without center)\n  \
             Bandwidth: {:.6} ({} in {:.3}ms)\n  \
             Convergence: {:.3}ms, {} iterations\n  \
             Centers: {} discovered, {} unique (dedup {:.3}ms)\n  \
             Neighbor cache: {} entries, {} computed\n  \
             Total: {:.3}ms",
            self.num_points,
            self.num_seeds,
            self.seeds_without_center,
            self.bandwidth,
            if self.bandwidth_estimated { "estimated" } else { "given" },
            millis(self.bandwidth_time),
            millis(self.convergence_time),
            self.total_iterations,
            self.discovered_centers,
            self.unique_centers,
            millis(self.dedup_time),
            self.cached_neighborhoods,
            self.neighborhood_computations,
            millis(self.total_time())
        )
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Builder for collecting statistics while a run progresses.
#[derive(Default)]
pub struct RunStatsBuilder {
    stats: RunStatistics,
}

impl RunStatsBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the problem size.
    pub fn points(&mut self, num_points: usize, num_seeds: usize) {
        self.stats.num_points = num_points;
        self.stats.num_seeds = num_seeds;
    }

    /// Record the bandwidth and how long it took to obtain.
    pub fn bandwidth(&mut self, bandwidth: f32, estimated: bool, elapsed: Duration) {
        self.stats.bandwidth = bandwidth;
        self.stats.bandwidth_estimated = estimated;
        self.stats.bandwidth_time = elapsed;
    }

    /// Record the outcome of the convergence phase.
    pub fn convergence(&mut self, elapsed: Duration, total_iterations: usize, without_center: usize) {
        self.stats.convergence_time = elapsed;
        self.stats.total_iterations = total_iterations;
        self.stats.seeds_without_center = without_center;
    }

    /// Record neighbor cache usage.
    pub fn cache(&mut self, cached: usize, computations: usize) {
        self.stats.cached_neighborhoods = cached;
        self.stats.neighborhood_computations = computations;
    }

    /// Record the outcome of deduplication.
    pub fn dedup(&mut self, elapsed: Duration, discovered: usize, unique: usize) {
        self.stats.dedup_time = elapsed;
        self.stats.discovered_centers = discovered;
        self.stats.unique_centers = unique;
    }

    /// Build the final statistics.
    pub fn build(self) -> RunStatistics {
        self.stats
    }
}
