//! Named constants for configuration values.
//!
//! This module centralizes magic numbers and default values used throughout
//! the codebase, making them easier to find, document, and tune.

/// Constants for the mean-shift engine.
pub mod meanshift {
    /// Default quantile for bandwidth estimation.
    /// 0.5 would use the median pairwise distance; 0.3 is a good starting point.
    pub const DEFAULT_QUANTILE: f32 = 0.3;

    /// Default maximum number of hill-climb iterations per seed.
    pub const DEFAULT_MAX_ITERATIONS: usize = 300;

    /// A seed has converged once its mean point moves less than
    /// `STOP_THRESHOLD_FACTOR * bandwidth`.
    pub const STOP_THRESHOLD_FACTOR: f32 = 1e-3;
}

/// Constants for the plain-text matrix format.
pub mod format {
    /// Maximum number of fractional digits written per value.
    pub const MAX_FRACTION_DIGITS: usize = 6;

    /// Separator between values on one row.
    pub const SEPARATOR: char = ',';
}

/// Constants for the worker pool.
pub mod pool {
    /// Prefix for worker thread names.
    pub const THREAD_NAME_PREFIX: &str = "meanshift-worker";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_in_range() {
        assert!((0.0..=1.0).contains(&meanshift::DEFAULT_QUANTILE));
        assert!(meanshift::DEFAULT_MAX_ITERATIONS > 0);
        assert!(meanshift::STOP_THRESHOLD_FACTOR > 0.0);
    }
}
