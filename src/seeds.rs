//! Seed selection: which points start a hill climb.

use crate::error::{MeanShiftError, Result};
use crate::stats::reduce_randomly;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// How the seed set of a run is chosen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSelection {
    /// Every point is a seed.
    #[default]
    All,
    /// At most this many points, sampled without replacement. `0` means all.
    Sample(usize),
    /// A caller-supplied list of distinct point indices.
    Explicit(Vec<usize>),
}

impl SeedSelection {
    /// Interpret a signed seed limit: non-positive means every point.
    pub fn from_max_seeds(max_seeds: i64) -> Self {
        if max_seeds <= 0 {
            Self::All
        } else {
            Self::Sample(max_seeds as usize)
        }
    }

    /// Produce the ordered seed list for a matrix of `n` points.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if an explicit seed is out of range or
    /// repeated.
    pub fn resolve<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<usize>> {
        match self {
            Self::All | Self::Sample(0) => Ok((0..n).collect()),
            Self::Sample(limit) => {
                let mut seeds: Vec<usize> = (0..n).collect();
                if *limit < n {
                    reduce_randomly(&mut seeds, *limit, rng);
                    info!("{} seeds to be used, from {}", seeds.len(), n);
                }
                Ok(seeds)
            }
            Self::Explicit(seeds) => {
                let mut seen = HashSet::with_capacity(seeds.len());
                for &s in seeds {
                    if s >= n {
                        return Err(MeanShiftError::invalid_parameter(format!(
                            "seed {} out of range for {} points",
                            s, n
                        )));
                    }
                    if !seen.insert(s) {
                        return Err(MeanShiftError::invalid_parameter(format!(
                            "seed {} listed more than once",
                            s
                        )));
                    }
                }
                Ok(seeds.clone())
            }
        }
    }
}
