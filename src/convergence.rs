//! Per-seed hill climbing towards a density mode.
//!
//! Only distances are known, so the "mean" of a neighborhood is its medoid:
//! the member with the smallest summed distance to every other member. A
//! climb repeatedly replaces its current point with the medoid of the current
//! point's neighborhood until the step is shorter than the stop threshold or
//! the iteration budget runs out.

use crate::matrix::DistanceMatrix;
use crate::neighborhood::NeighborhoodIndex;
use tracing::trace;

/// A converged climb: the mode it reached and the size of the last
/// neighborhood it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    /// Point index of the mode.
    pub center: usize,
    /// Size of the neighborhood at the final step.
    pub intensity: usize,
    /// Iterations completed before the climb stopped.
    pub iterations: usize,
}

/// Return the member of `points` with the smallest summed distance to all
/// members, or `None` if `points` is empty.
///
/// Ties keep the first minimum in scan order.
pub fn medoid<M>(points: &[usize], matrix: &M) -> Option<usize>
where
    M: DistanceMatrix + ?Sized,
{
    let mut best: Option<(usize, f32)> = None;
    for &p in points {
        let sum = matrix.row_sum(p, points);
        if best.map_or(true, |(_, min)| sum < min) {
            best = Some((p, sum));
        }
    }
    best.map(|(p, _)| p)
}

/// Drives hill climbs against a shared neighborhood index.
pub struct HillClimber<'i, 'a, M: DistanceMatrix + ?Sized> {
    index: &'i NeighborhoodIndex<'a, M>,
    max_iterations: usize,
    stop_threshold: f32,
}

impl<'i, 'a, M: DistanceMatrix + ?Sized> HillClimber<'i, 'a, M> {
    /// Create a climber.
    ///
    /// A climb stops once the mean point moves less than `stop_threshold`, or
    /// after `max_iterations` completed iterations.
    pub fn new(index: &'i NeighborhoodIndex<'a, M>, max_iterations: usize, stop_threshold: f32) -> Self {
        Self {
            index,
            max_iterations,
            stop_threshold,
        }
    }

    /// Climb from `seed` and return the mode reached, or `None` if some
    /// neighborhood along the way was empty.
    ///
    /// Performs at most `max_iterations + 1` neighborhood lookups.
    pub fn climb(&self, seed: usize) -> Option<Mode> {
        let matrix = self.index.matrix();
        let mut current = seed;
        let mut completed = 0;

        loop {
            let neighbors = self.index.neighbors(current);
            let mean = medoid(&neighbors, matrix)?;

            if matrix.get(mean, current) < self.stop_threshold || completed == self.max_iterations {
                trace!(seed, center = mean, iterations = completed, "seed converged");
                return Some(Mode {
                    center: mean,
                    intensity: neighbors.len(),
                    iterations: completed,
                });
            }

            current = mean;
            completed += 1;
        }
    }
}
