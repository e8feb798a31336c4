//! Radius queries over a distance matrix with a per-run neighbor cache.
//!
//! During one clustering run the bandwidth never changes, so the neighbor
//! list of a point never changes either. [`NeighborhoodIndex`] computes it the
//! first time any worker asks for a point and hands out the same shared list
//! afterwards. Every index can be cached, not just the initial seeds: a climb
//! routinely lands on mean points that were never seeds.
//!
//! Each slot has its own lock, so workers touching different points never
//! contend. Two workers racing on the same empty slot may both compute the
//! list; the first one to store it wins and the other result is dropped.

use crate::matrix::DistanceMatrix;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Flat-kernel membership test.
///
/// A distance is inside the radius when it is strictly below it. Coincident
/// points (distance 0) are always inside, which keeps a point in its own
/// neighborhood even when the radius degenerates to 0.
#[inline]
pub fn within_radius(distance: f32, radius: f32) -> bool {
    distance < radius || distance <= 0.0
}

/// Cached radius queries for one clustering run.
pub struct NeighborhoodIndex<'a, M: DistanceMatrix + ?Sized> {
    matrix: &'a M,
    radius: f32,
    /// One slot per row; `None` until first queried.
    cache: Vec<RwLock<Option<Arc<[usize]>>>>,
    /// Number of lists computed, including ones lost to a race.
    computed: AtomicUsize,
}

impl<'a, M: DistanceMatrix + ?Sized> NeighborhoodIndex<'a, M> {
    /// Create an empty index over `matrix` with a fixed radius.
    pub fn new(matrix: &'a M, radius: f32) -> Self {
        let cache = (0..matrix.rows()).map(|_| RwLock::new(None)).collect();
        Self {
            matrix,
            radius,
            cache,
            computed: AtomicUsize::new(0),
        }
    }

    /// The fixed radius of this index.
    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// The underlying matrix.
    #[inline]
    pub fn matrix(&self) -> &'a M {
        self.matrix
    }

    /// Ascending indices of every column within the radius of `point`.
    ///
    /// The first call for a point computes the list; later calls return the
    /// same shared list.
    ///
    /// # Panics
    /// Panics if `point >= matrix.rows()`.
    pub fn neighbors(&self, point: usize) -> Arc<[usize]> {
        let slot = &self.cache[point];
        if let Some(hit) = slot.read().as_ref() {
            return Arc::clone(hit);
        }

        let fresh: Arc<[usize]> = self.compute_neighbors(point).into();
        self.computed.fetch_add(1, Ordering::Relaxed);

        let mut guard = slot.write();
        Arc::clone(guard.get_or_insert(fresh))
    }

    /// Uncached unrestricted query: compare `point` against every column.
    pub fn compute_neighbors(&self, point: usize) -> Vec<usize> {
        (0..self.matrix.cols())
            .filter(|&j| within_radius(self.matrix.get(point, j), self.radius))
            .collect()
    }

    /// Restricted query: positions in `candidates` whose point lies within
    /// the radius of `point`.
    ///
    /// Returns positions into `candidates`, not point indices.
    pub fn positions_within(&self, point: usize, candidates: &[usize]) -> Vec<usize> {
        candidates
            .iter()
            .enumerate()
            .filter(|&(_, &c)| within_radius(self.matrix.get(point, c), self.radius))
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Number of points whose neighbor list is cached.
    pub fn cached_len(&self) -> usize {
        self.cache.iter().filter(|slot| slot.read().is_some()).count()
    }

    /// Return true if the neighbor list of `point` is cached.
    pub fn is_cached(&self, point: usize) -> bool {
        self.cache.get(point).is_some_and(|slot| slot.read().is_some())
    }

    /// Number of neighbor lists computed so far, including duplicates
    /// discarded after a race.
    pub fn computations(&self) -> usize {
        self.computed.load(Ordering::Relaxed)
    }
}
