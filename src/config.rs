//! Run configuration for the mean-shift engine.
//!
//! ```
//! use forge_meanshift::{MeanShiftConfig, PoolSize, SeedSelection};
//!
//! let config = MeanShiftConfig::default()
//!     .with_quantile(0.5)
//!     .with_max_iterations(100)
//!     .with_seeds(SeedSelection::Sample(500))
//!     .with_pool(PoolSize::Fixed(4));
//!
//! assert!(config.validate().is_ok());
//! ```
//!
//! Configurations can also be read from JSON; missing fields take their
//! defaults:
//!
//! ```json
//! { "quantile": 0.5, "seeds": { "sample": 500 }, "pool": { "fixed": 4 } }
//! ```

use crate::bandwidth::validate_quantile;
use crate::constants::meanshift::{DEFAULT_MAX_ITERATIONS, DEFAULT_QUANTILE};
use crate::error::{MeanShiftError, Result};
use crate::parallel::PoolSize;
use crate::seeds::SeedSelection;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters of one clustering run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanShiftConfig {
    /// Fraction of points used to pick the k in the k-th nearest neighbor
    /// distance for bandwidth estimation. Must be in `[0, 1]`.
    pub quantile: f32,
    /// Maximum hill-climb iterations per seed.
    pub max_iterations: usize,
    /// Which points start a climb.
    pub seeds: SeedSelection,
    /// Fixed bandwidth; skips estimation when set.
    pub bandwidth: Option<f32>,
    /// Worker pool used for bandwidth estimation and convergence.
    pub pool: PoolSize,
}

impl Default for MeanShiftConfig {
    fn default() -> Self {
        Self {
            quantile: DEFAULT_QUANTILE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seeds: SeedSelection::All,
            bandwidth: None,
            pool: PoolSize::Global,
        }
    }
}

impl MeanShiftConfig {
    /// Set the bandwidth quantile.
    pub fn with_quantile(mut self, quantile: f32) -> Self {
        self.quantile = quantile;
        self
    }

    /// Set the per-seed iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the seed selection.
    pub fn with_seeds(mut self, seeds: SeedSelection) -> Self {
        self.seeds = seeds;
        self
    }

    /// Use a fixed bandwidth instead of estimating one.
    pub fn with_bandwidth(mut self, bandwidth: f32) -> Self {
        self.bandwidth = Some(bandwidth);
        self
    }

    /// Set the worker pool size.
    pub fn with_pool(mut self, pool: PoolSize) -> Self {
        self.pool = pool;
        self
    }

    /// Check every parameter that can be checked without the matrix.
    ///
    /// # Errors
    /// Returns `InvalidParameter` describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        validate_quantile(self.quantile)?;

        if let Some(bandwidth) = self.bandwidth {
            if !bandwidth.is_finite() || bandwidth < 0.0 {
                return Err(MeanShiftError::invalid_parameter(format!(
                    "bandwidth must be finite and non-negative, got {}",
                    bandwidth
                )));
            }
            if bandwidth == 0.0 && self.max_iterations == 0 {
                return Err(MeanShiftError::NonTerminating { bandwidth });
            }
        }

        if self.pool == PoolSize::Fixed(0) {
            return Err(MeanShiftError::invalid_parameter(
                "fixed pool size must be at least 1",
            ));
        }

        Ok(())
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
