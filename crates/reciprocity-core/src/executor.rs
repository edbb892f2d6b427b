//! Fan-out/fan-in over independent tribes.
//!
//! Tribes share no mutable state and each owns its generator, so a tribe's
//! result does not depend on which worker runs it or when. Results come back
//! in the input order; a failure in any tribe fails the whole call.

use crate::config::SimConfig;
use crate::tribe::Tribe;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::{error::Error, fmt};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    WorkerPanicked { tribe_index: usize, message: String },
    ThreadPool(String),
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::WorkerPanicked {
                tribe_index,
                message,
            } => write!(f, "worker for tribe {tribe_index} panicked: {message}"),
            ExecutorError::ThreadPool(reason) => {
                write!(f, "failed to build worker pool: {reason}")
            }
        }
    }
}

impl Error for ExecutorError {}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

pub struct TribeExecutor {
    mode: ExecutionMode,
    // `None` in parallel mode means rayon's global pool.
    pool: Option<rayon::ThreadPool>,
}

impl fmt::Debug for TribeExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TribeExecutor")
            .field("mode", &self.mode)
            .field("threads", &self.num_threads())
            .finish()
    }
}

impl TribeExecutor {
    pub fn sequential() -> Self {
        Self {
            mode: ExecutionMode::Sequential,
            pool: None,
        }
    }

    /// Parallel executor; `worker_threads == 0` runs on rayon's global pool.
    pub fn parallel(worker_threads: usize) -> Result<Self, ExecutorError> {
        let pool = if worker_threads == 0 {
            None
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(worker_threads)
                .thread_name(|i| format!("tribe-worker-{i}"))
                .build()
                .map_err(|e| ExecutorError::ThreadPool(e.to_string()))?;
            Some(pool)
        };
        Ok(Self {
            mode: ExecutionMode::Parallel,
            pool,
        })
    }

    pub fn from_config(config: &SimConfig) -> Result<Self, ExecutorError> {
        if config.parallel {
            Self::parallel(config.worker_threads)
        } else {
            Ok(Self::sequential())
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn num_threads(&self) -> usize {
        match (self.mode, &self.pool) {
            (ExecutionMode::Sequential, _) => 1,
            (ExecutionMode::Parallel, Some(pool)) => pool.current_num_threads(),
            (ExecutionMode::Parallel, None) => rayon::current_num_threads(),
        }
    }

    /// Apply `f` to every tribe, one task per tribe, and return the results in
    /// the order of `tribes`.
    ///
    /// A panic inside `f` is caught and reported with the tribe's index; the
    /// call then fails as a whole and no partial result is returned.
    pub fn map_tribes<R, F>(&self, tribes: &mut [Tribe], f: F) -> Result<Vec<R>, ExecutorError>
    where
        R: Send,
        F: Fn(&mut Tribe) -> R + Sync,
    {
        let run_one = |tribe: &mut Tribe| -> Result<R, ExecutorError> {
            let tribe_index = tribe.index();
            panic::catch_unwind(AssertUnwindSafe(|| f(tribe))).map_err(|payload| {
                ExecutorError::WorkerPanicked {
                    tribe_index,
                    message: panic_message(payload.as_ref()),
                }
            })
        };

        let results: Vec<Result<R, ExecutorError>> = match self.mode {
            ExecutionMode::Sequential => tribes.iter_mut().map(&run_one).collect(),
            ExecutionMode::Parallel => match &self.pool {
                Some(pool) => pool.install(|| tribes.par_iter_mut().map(&run_one).collect()),
                None => tribes.par_iter_mut().map(&run_one).collect(),
            },
        };

        results.into_iter().collect()
    }

    /// Play one generation in every tribe and return each tribe's total, by index.
    pub fn play_tribes(
        &self,
        tribes: &mut [Tribe],
        cost: i64,
        benefit: i64,
    ) -> Result<Vec<i64>, ExecutorError> {
        self.map_tribes(tribes, |tribe| tribe.play_rounds(cost, benefit))
    }
}
