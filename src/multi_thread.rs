//! Thread-per-worker estimator.
//!
//! The index range is split into static blocks with [`partition`]. Each
//! worker builds its own generator and counter, then merges its count into a
//! shared [`AtomicU64`] exactly once. The total is read only after every
//! worker has been joined.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use tracing::{debug, info};

use crate::error::{
    check_points, check_threads, panic_reason, reserve_workers, EstimateError, Result,
};
use crate::sampling::{Seeding, SourceFactory};
use crate::tally::{count_inside, Tally};

/// Splits `0..total` into `workers` contiguous blocks.
///
/// Every block holds `total / workers` indices and the last one also takes
/// the remainder. Blocks are empty when there are more workers than indices.
/// Blocks are produced lazily, so nothing is allocated per worker here.
pub fn blocks(total: u64, workers: usize) -> impl Iterator<Item = Range<u64>> {
    let per_worker = if workers == 0 { 0 } else { total / workers as u64 };

    (0..workers).map(move |worker_id| {
        let start = worker_id as u64 * per_worker;
        let end = if worker_id == workers - 1 {
            total
        } else {
            start + per_worker
        };
        start..end
    })
}

/// [`blocks`] collected into a `Vec`.
pub fn partition(total: u64, workers: usize) -> Vec<Range<u64>> {
    blocks(total, workers).collect()
}

/// Worker body shared by every parallel backend.
pub(crate) fn run_worker<F: SourceFactory + ?Sized>(
    factory: &F,
    worker_id: usize,
    range: Range<u64>,
    total_inside: &AtomicU64,
) {
    let mut source = factory.source_for(worker_id, range.clone());
    let inside = count_inside(&mut source, range.end - range.start);

    total_inside.fetch_add(inside, Ordering::Relaxed);
    debug!(worker_id, start = range.start, end = range.end, inside, "worker merged");
}

/// Estimates π with `num_workers` threads and fresh entropy per worker.
pub fn estimate_pi_multi_thread(total_points: u64, num_workers: usize) -> Result<f64> {
    tally_multi_thread(total_points, num_workers, &Seeding::Entropy).map(|tally| tally.estimate())
}

pub fn tally_multi_thread<F: SourceFactory + ?Sized>(
    total_points: u64,
    num_workers: usize,
    factory: &F,
) -> Result<Tally> {
    check_points(total_points)?;
    check_threads(num_workers)?;

    let total_inside = AtomicU64::new(0);

    thread::scope(|scope| -> Result<()> {
        let mut handles = Vec::new();
        reserve_workers(&mut handles, num_workers)?;

        for (worker_id, range) in blocks(total_points, num_workers).enumerate() {
            let total_inside = &total_inside;
            let handle = thread::Builder::new()
                .name(format!("pi-worker-{worker_id}"))
                .spawn_scoped(scope, move || {
                    run_worker(factory, worker_id, range, total_inside)
                })
                .map_err(|err| EstimateError::ResourceExhaustion {
                    worker: worker_id,
                    source: Box::new(err),
                })?;
            handles.push(handle);
        }

        // Join everything before reporting so no panicked thread is left for
        // the scope to re-raise.
        let mut failure = None;
        for (worker_id, handle) in handles.into_iter().enumerate() {
            if let Err(payload) = handle.join() {
                failure.get_or_insert(EstimateError::WorkerFailed {
                    worker: worker_id,
                    reason: panic_reason(payload.as_ref()),
                });
            }
        }
        failure.map_or(Ok(()), Err)
    })?;

    let tally = Tally {
        inside: total_inside.load(Ordering::Relaxed),
        total: total_points,
    };
    info!(
        total_points,
        num_workers,
        inside = tally.inside,
        estimate = tally.estimate(),
        "multi-threaded estimate done"
    );
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::{Replay, ReplayCursor, Sample, SampleSource};
    use crate::single_thread::tally_single_thread;
    use std::sync::Mutex;

    fn assert_covers_exactly_once(total: u64, ranges: &[Range<u64>]) {
        let mut seen = vec![0u8; total as usize];
        for range in ranges {
            for i in range.clone() {
                seen[i as usize] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1), "total={total} ranges={ranges:?}");
    }

    #[test]
    fn partition_covers_every_index_once() {
        for total in [1, 2, 3, 7, 10, 100, 1_001] {
            for workers in 1..=12 {
                let ranges = partition(total, workers);
                assert_eq!(ranges.len(), workers);
                assert_covers_exactly_once(total, &ranges);
            }
        }
    }

    #[test]
    fn last_worker_takes_the_remainder() {
        assert_eq!(partition(10, 3), vec![0..3, 3..6, 6..10]);
        assert_eq!(partition(2, 4), vec![0..0, 0..0, 0..0, 0..2]);
    }

    /// Records which indices each worker was handed.
    struct Capture {
        ranges: Mutex<Vec<(usize, Range<u64>)>>,
        inner: Replay,
    }

    impl SourceFactory for Capture {
        type Source = ReplayCursor;

        fn source_for(&self, worker: usize, indices: Range<u64>) -> ReplayCursor {
            self.ranges.lock().unwrap().push((worker, indices.clone()));
            self.inner.source_for(worker, indices)
        }
    }

    #[test]
    fn workers_receive_disjoint_covering_ranges() {
        let capture = Capture {
            ranges: Mutex::new(Vec::new()),
            inner: Replay::new([(0.0, 0.0)]).unwrap(),
        };
        let tally = tally_multi_thread(1_003, 8, &capture).unwrap();
        assert_eq!(tally.inside, 1_003);

        let mut seen = capture.ranges.into_inner().unwrap();
        seen.sort_by_key(|(worker, _)| *worker);
        let workers: Vec<usize> = seen.iter().map(|(w, _)| *w).collect();
        assert_eq!(workers, (0..8).collect::<Vec<_>>());

        let ranges: Vec<Range<u64>> = seen.into_iter().map(|(_, r)| r).collect();
        assert_covers_exactly_once(1_003, &ranges);
    }

    #[test]
    fn replay_counts_match_single_thread_for_any_worker_count() {
        let samples: Vec<Sample> = (0..97)
            .map(|i| Sample::new((i % 10) as f64 / 10.0, (i % 13) as f64 / 13.0))
            .collect();
        let replay = Replay::new(samples).unwrap();

        let expected = tally_single_thread(5_000, &replay).unwrap();
        for workers in [1, 2, 3, 4, 7, 16] {
            let tally = tally_multi_thread(5_000, workers, &replay).unwrap();
            assert_eq!(tally, expected, "workers={workers}");
        }
    }

    #[test]
    fn replayed_points_give_three() {
        let replay = Replay::new([(0.1, 0.1), (0.9, 0.9), (0.5, 0.5), (0.0, 0.99)]).unwrap();
        let tally = tally_multi_thread(4, 2, &replay).unwrap();
        assert_eq!(tally.inside, 3);
        assert_eq!(tally.estimate(), 3.0);
    }

    #[test]
    fn one_worker_matches_single_thread_with_the_same_seed() {
        let seeding = Seeding::Seeded(2024);
        let single = tally_single_thread(50_000, &seeding).unwrap();
        let parallel = tally_multi_thread(50_000, 1, &seeding).unwrap();
        assert_eq!(single, parallel);
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        assert!(matches!(
            estimate_pi_multi_thread(0, 4),
            Err(EstimateError::InvalidArgument(_))
        ));
        assert!(matches!(
            estimate_pi_multi_thread(100, 0),
            Err(EstimateError::InvalidArgument(_))
        ));
    }

    #[test]
    fn absurd_worker_count_is_resource_exhaustion() {
        let err = tally_multi_thread(10, usize::MAX, &Seeding::Entropy).unwrap_err();
        assert!(
            matches!(err, EstimateError::ResourceExhaustion { worker: 0, .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn blocks_are_lazy_for_huge_worker_counts() {
        let mut iter = blocks(10, 1 << 40);
        assert_eq!(iter.next(), Some(0..0));
        assert_eq!(iter.size_hint(), ((1 << 40) - 1, Some((1 << 40) - 1)));
    }

    #[test]
    fn more_workers_than_points_still_counts_everything() {
        let replay = Replay::new([(0.0, 0.0)]).unwrap();
        let tally = tally_multi_thread(3, 8, &replay).unwrap();
        assert_eq!(tally.inside, 3);
    }

    struct Exploding;

    struct Origin;

    impl SampleSource for Origin {
        fn draw(&mut self) -> Sample {
            Sample::new(0.0, 0.0)
        }
    }

    impl SourceFactory for Exploding {
        type Source = Origin;

        fn source_for(&self, worker: usize, _indices: Range<u64>) -> Origin {
            if worker == 1 {
                panic!("generator unavailable");
            }
            Origin
        }
    }

    #[test]
    fn a_failed_worker_fails_the_whole_estimate() {
        let err = tally_multi_thread(100, 3, &Exploding).unwrap_err();
        match err {
            EstimateError::WorkerFailed { worker, reason } => {
                assert_eq!(worker, 1);
                assert_eq!(reason, "generator unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn error_shrinks_with_more_points() {
        let trials = 8;
        let mean_error = |points: u64| {
            (0..trials)
                .map(|seed| {
                    let pi = tally_multi_thread(points, 4, &Seeding::Seeded(seed))
                        .unwrap()
                        .estimate();
                    (pi - std::f64::consts::PI).abs()
                })
                .sum::<f64>()
                / trials as f64
        };

        let coarse = mean_error(1_000);
        let fine = mean_error(1_000_000);
        assert!(fine < coarse, "fine={fine} coarse={coarse}");
    }

    #[test]
    fn estimate_is_bounded() {
        for (points, workers) in [(1, 1), (5, 3), (10_000, 4), (100_000, 8)] {
            let pi = estimate_pi_multi_thread(points, workers).unwrap();
            assert!((0.0..=4.0).contains(&pi));
        }
    }
}
