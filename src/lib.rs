//! forge-meanshift: parallel mean-shift clustering over distance matrices.
//!
//! This crate clusters points known only through their pairwise distances,
//! using mean shift with a flat kernel. Every seed climbs to the medoid of its
//! neighborhood until it settles on a density mode; nearby modes are then
//! merged, keeping the densest one.
//!
//! # Features
//!
//! - **Bandwidth Estimation**: mean k-th nearest neighbor distance, computed per row in parallel
//! - **Shared Neighbor Cache**: each neighborhood is computed once per run, from any worker
//! - **Parallel Convergence**: one hill climb per seed on a bounded rayon pool
//! - **Seed Sampling**: cluster from a random subset of points with an injectable RNG
//! - **Plain-Text Matrices**: load and save comma-separated distance tables
//!
//! # Example
//!
//! ```
//! use forge_meanshift::{DenseMatrix, MeanShift, MeanShiftConfig, PoolSize};
//!
//! let matrix = DenseMatrix::from_rows(vec![
//!     vec![0.0, 1.0, 9.0, 9.5],
//!     vec![1.0, 0.0, 8.0, 8.5],
//!     vec![9.0, 8.0, 0.0, 0.5],
//!     vec![9.5, 8.5, 0.5, 0.0],
//! ])?;
//!
//! let config = MeanShiftConfig::default()
//!     .with_bandwidth(2.0)
//!     .with_pool(PoolSize::Fixed(2));
//! let clustering = MeanShift::new(config).cluster(&matrix)?;
//!
//! assert_eq!(clustering.sorted_indices(), vec![0, 2]);
//! # Ok::<(), forge_meanshift::MeanShiftError>(())
//! ```

pub mod bandwidth;
pub mod config;
pub mod constants;
pub mod convergence;
pub mod error;
pub mod matrix;
pub mod meanshift;
pub mod metrics;
pub mod neighborhood;
pub mod parallel;
pub mod persistence;
pub mod seeds;
pub mod stats;

// Re-export commonly used types at crate root
pub use bandwidth::estimate_bandwidth;
pub use config::MeanShiftConfig;
pub use error::{MeanShiftError, Result};
pub use matrix::{DenseMatrix, DistanceMatrix};
pub use meanshift::{cluster, Center, Clustering, MeanShift};
pub use metrics::RunStatistics;
pub use neighborhood::NeighborhoodIndex;
pub use parallel::{ParallelMap, PoolSize};
pub use persistence::Persistable;
pub use seeds::SeedSelection;
