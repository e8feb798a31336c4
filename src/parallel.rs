//! Parallel map over a bounded worker pool.
//!
//! [`ParallelMap`] applies one closure to every element of a slice (or every
//! index of a range) and blocks until the whole batch is done. It is the only
//! concurrency primitive the engine uses: bandwidth estimation maps over rows
//! and convergence runs one unit per seed.
//!
//! # Failure semantics
//!
//! Every unit returns a [`Result`]. A unit that returns an error, or panics,
//! fails the batch and that error is returned to the caller. Units already
//! running are allowed to finish before the call returns; units not yet
//! started may be skipped. Nothing keeps running after the call returns.

use crate::constants::pool::THREAD_NAME_PREFIX;
use crate::error::{MeanShiftError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// How many workers execute a batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolSize {
    /// Run every unit inline on the calling thread, in order.
    Sequential,
    /// A dedicated pool with exactly this many threads.
    Fixed(usize),
    /// The process-wide rayon pool, sized to the available cores.
    #[default]
    Global,
}

/// Executes independent units of work across a worker pool.
pub struct ParallelMap {
    size: PoolSize,
    /// Dedicated pool for [`PoolSize::Fixed`]; `None` otherwise.
    pool: Option<rayon::ThreadPool>,
}

impl ParallelMap {
    /// Create an executor for the given pool size.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for `Fixed(0)` and `ThreadPool` if the
    /// dedicated pool cannot be started.
    pub fn new(size: PoolSize) -> Result<Self> {
        let pool = match size {
            PoolSize::Fixed(0) => {
                return Err(MeanShiftError::invalid_parameter(
                    "fixed pool size must be at least 1",
                ))
            }
            PoolSize::Fixed(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("{}-{}", THREAD_NAME_PREFIX, i))
                    .build()?,
            ),
            PoolSize::Sequential | PoolSize::Global => None,
        };

        Ok(Self { size, pool })
    }

    /// Executor that runs everything on the calling thread.
    pub fn sequential() -> Self {
        Self {
            size: PoolSize::Sequential,
            pool: None,
        }
    }

    /// Executor backed by the global rayon pool.
    pub fn global() -> Self {
        Self {
            size: PoolSize::Global,
            pool: None,
        }
    }

    /// The configured pool size.
    pub fn size(&self) -> PoolSize {
        self.size
    }

    /// Number of worker threads a batch may use.
    pub fn threads(&self) -> usize {
        match (&self.pool, self.size) {
            (Some(pool), _) => pool.current_num_threads(),
            (None, PoolSize::Sequential) => 1,
            (None, _) => rayon::current_num_threads(),
        }
    }

    /// Apply `f` to every item and collect the results in input order.
    pub fn map<T, V, F>(&self, items: &[T], f: F) -> Result<Vec<V>>
    where
        T: Sync,
        V: Send,
        F: Fn(&T) -> Result<V> + Sync + Send,
    {
        match self.size {
            PoolSize::Sequential => items.iter().map(|item| guarded(|| f(item))).collect(),
            _ => self.install(|| items.par_iter().map(|item| guarded(|| f(item))).collect()),
        }
    }

    /// Apply `f` to every item for its side effects only.
    pub fn for_each<T, F>(&self, items: &[T], f: F) -> Result<()>
    where
        T: Sync,
        F: Fn(&T) -> Result<()> + Sync + Send,
    {
        match self.size {
            PoolSize::Sequential => items.iter().try_for_each(|item| guarded(|| f(item))),
            _ => self.install(|| items.par_iter().try_for_each(|item| guarded(|| f(item)))),
        }
    }

    /// Apply `f` to every index in `range` and collect the results in order.
    pub fn map_range<V, F>(&self, range: Range<usize>, f: F) -> Result<Vec<V>>
    where
        V: Send,
        F: Fn(usize) -> Result<V> + Sync + Send,
    {
        match self.size {
            PoolSize::Sequential => range.map(|i| guarded(|| f(i))).collect(),
            _ => self.install(|| range.into_par_iter().map(|i| guarded(|| f(i))).collect()),
        }
    }

    /// Apply `f` to every index in `range` for its side effects only.
    pub fn for_range<F>(&self, range: Range<usize>, f: F) -> Result<()>
    where
        F: Fn(usize) -> Result<()> + Sync + Send,
    {
        match self.size {
            PoolSize::Sequential => range.into_iter().try_for_each(|i| guarded(|| f(i))),
            _ => self.install(|| range.into_par_iter().try_for_each(|i| guarded(|| f(i)))),
        }
    }

    fn install<R, OP>(&self, op: OP) -> R
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl Default for ParallelMap {
    fn default() -> Self {
        Self::global()
    }
}

impl std::fmt::Debug for ParallelMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelMap")
            .field("size", &self.size)
            .field("threads", &self.threads())
            .finish()
    }
}

/// Run one unit, turning a panic into `TaskFailed`.
fn guarded<V>(unit: impl FnOnce() -> Result<V>) -> Result<V> {
    catch_unwind(AssertUnwindSafe(unit)).unwrap_or_else(|payload| {
        Err(MeanShiftError::task_failed(panic_message(payload.as_ref())))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unit of work panicked".to_string()
    }
}
