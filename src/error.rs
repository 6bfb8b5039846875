use thiserror::Error;

/// Why an estimate could not be produced.
#[derive(Debug, Error)]
pub enum EstimateError {
    /// A point count or thread count that is zero or negative.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The OS, the allocator or the runtime refused to give us a worker.
    #[error("could not start worker {worker}: {source}")]
    ResourceExhaustion {
        worker: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The blocking call was made on a thread already driving a tokio runtime.
    #[error("already inside a tokio runtime; await tally_blocking_pool_async instead")]
    InsideRuntime,

    /// A worker died before merging its count.
    #[error("worker {worker} failed: {reason}")]
    WorkerFailed { worker: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, EstimateError>;

/// Rejects zero point counts before anything divides by them.
pub(crate) fn check_points(total_points: u64) -> Result<()> {
    if total_points == 0 {
        return Err(EstimateError::InvalidArgument(
            "number of points must be positive".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_threads(threads: usize) -> Result<()> {
    if threads == 0 {
        return Err(EstimateError::InvalidArgument(
            "number of threads must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Reserves room for one entry per worker without aborting on huge counts.
pub(crate) fn reserve_workers<T>(slots: &mut Vec<T>, workers: usize) -> Result<()> {
    slots
        .try_reserve_exact(workers)
        .map_err(|err| EstimateError::ResourceExhaustion {
            worker: 0,
            source: Box::new(err),
        })
}

/// Converts a panic payload from a joined worker into a readable reason.
pub(crate) fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
