//! The same estimator run on tokio's blocking pool instead of ad-hoc threads.
//!
//! A [`BlockingPool`] owns a runtime whose blocking pool is capped at the
//! requested worker count, so exactly that many OS threads do the sampling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task;
use tracing::info;

use crate::error::{check_points, check_threads, reserve_workers, EstimateError, Result};
use crate::multi_thread::{blocks, run_worker};
use crate::sampling::SourceFactory;
use crate::tally::Tally;

pub struct BlockingPool {
    runtime: Runtime,
    num_tasks: usize,
}

impl BlockingPool {
    /// Builds the runtime. Must not be called from a thread that is already
    /// driving a tokio runtime; use [`tally_blocking_pool_async`] there.
    pub fn new(num_tasks: usize) -> Result<Self> {
        check_threads(num_tasks)?;
        if Handle::try_current().is_ok() {
            return Err(EstimateError::InsideRuntime);
        }

        let runtime = Builder::new_current_thread()
            .max_blocking_threads(num_tasks)
            .thread_name("pi-blocking")
            .build()
            .map_err(|err| EstimateError::ResourceExhaustion {
                worker: 0,
                source: Box::new(err),
            })?;

        Ok(Self { runtime, num_tasks })
    }

    pub fn num_tasks(&self) -> usize {
        self.num_tasks
    }

    pub fn tally<F>(&self, total_points: u64, factory: Arc<F>) -> Result<Tally>
    where
        F: SourceFactory + Send + 'static,
    {
        self.runtime
            .block_on(tally_blocking_pool_async(total_points, self.num_tasks, factory))
    }
}

/// Builds a [`BlockingPool`] for one call and runs the estimate on it.
pub fn tally_blocking_pool<F>(total_points: u64, num_tasks: usize, factory: Arc<F>) -> Result<Tally>
where
    F: SourceFactory + Send + 'static,
{
    check_points(total_points)?;
    BlockingPool::new(num_tasks)?.tally(total_points, factory)
}

/// Runs the workers as `spawn_blocking` tasks on the current runtime.
pub async fn tally_blocking_pool_async<F>(
    total_points: u64,
    num_tasks: usize,
    factory: Arc<F>,
) -> Result<Tally>
where
    F: SourceFactory + Send + 'static,
{
    check_points(total_points)?;
    check_threads(num_tasks)?;

    let total_inside = Arc::new(AtomicU64::new(0));
    let mut handles = Vec::new();
    reserve_workers(&mut handles, num_tasks)?;

    for (task_id, range) in blocks(total_points, num_tasks).enumerate() {
        let factory = Arc::clone(&factory);
        let total_inside = Arc::clone(&total_inside);

        let handle = task::spawn_blocking(move || {
            run_worker(factory.as_ref(), task_id, range, &total_inside)
        });
        handles.push(handle);
    }

    let mut failure = None;
    for (task_id, handle) in handles.into_iter().enumerate() {
        if let Err(err) = handle.await {
            failure.get_or_insert(EstimateError::WorkerFailed {
                worker: task_id,
                reason: err.to_string(),
            });
        }
    }
    if let Some(err) = failure {
        return Err(err);
    }

    let tally = Tally {
        inside: total_inside.load(Ordering::Relaxed),
        total: total_points,
    };
    info!(
        total_points,
        num_tasks,
        inside = tally.inside,
        estimate = tally.estimate(),
        "blocking-pool estimate done"
    );
    Ok(tally)
}
