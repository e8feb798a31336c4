//! Error types for forge-meanshift operations.
//!
//! Errors fall into two groups: invalid arguments, which are rejected before
//! any work starts, and resource failures (I/O, malformed files, worker pool
//! problems) which are wrapped and surfaced to the caller of the entry point.

use std::io;
use thiserror::Error;

/// Result type alias using [`MeanShiftError`].
pub type Result<T> = std::result::Result<T, MeanShiftError>;

/// Errors that can occur during clustering, matrix I/O, or parallel execution.
#[derive(Error, Debug)]
pub enum MeanShiftError {
    /// Invalid parameter value provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Order-statistic query asked for a rank the row does not have.
    #[error("k out of range: requested k={k} in a row of length {len}")]
    KthOutOfRange {
        /// Requested 1-based rank.
        k: usize,
        /// Number of values available.
        len: usize,
    },

    /// A non-positive bandwidth with zero iterations never converges.
    #[error("non-terminating configuration: bandwidth {bandwidth} is not positive and max_iterations is 0")]
    NonTerminating {
        /// The offending bandwidth.
        bandwidth: f32,
    },

    /// Operation requires at least one row.
    #[error("empty matrix: operation requires at least one row")]
    EmptyMatrix,

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Matrix file could not be parsed.
    #[error("invalid file format at line {line}: {message}")]
    InvalidFormat {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// Worker pool could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(String),

    /// A unit of work inside a parallel batch failed.
    #[error("parallel task failed: {0}")]
    TaskFailed(String),

    /// Configuration file could not be decoded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MeanShiftError {
    /// Creates a new `InvalidParameter` error.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Creates a new `KthOutOfRange` error.
    pub fn kth_out_of_range(k: usize, len: usize) -> Self {
        Self::KthOutOfRange { k, len }
    }

    /// Creates a new `InvalidFormat` error.
    pub fn invalid_format(line: usize, msg: impl Into<String>) -> Self {
        Self::InvalidFormat {
            line,
            message: msg.into(),
        }
    }

    /// Creates a new `TaskFailed` error.
    pub fn task_failed(msg: impl Into<String>) -> Self {
        Self::TaskFailed(msg.into())
    }

    /// Returns true for errors caused by the caller's arguments rather than
    /// by the environment.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter(_)
                | Self::KthOutOfRange { .. }
                | Self::NonTerminating { .. }
                | Self::EmptyMatrix
        )
    }
}

impl From<serde_json::Error> for MeanShiftError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for MeanShiftError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool(err.to_string())
    }
}
