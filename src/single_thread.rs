use tracing::info;

use crate::error::{check_points, Result};
use crate::sampling::{Seeding, SourceFactory};
use crate::tally::{count_inside, Tally};

/// Estimates π on the calling thread with a fresh entropy-seeded generator.
pub fn estimate_pi_single_thread(total_points: u64) -> Result<f64> {
    tally_single_thread(total_points, &Seeding::Entropy).map(|tally| tally.estimate())
}

/// Runs the whole sampling loop on the calling thread.
///
/// The source is built as worker `0` over `0..total_points`, so a factory
/// sees exactly the same request as a one-thread parallel run.
pub fn tally_single_thread<F: SourceFactory + ?Sized>(
    total_points: u64,
    factory: &F,
) -> Result<Tally> {
    check_points(total_points)?;

    let mut source = factory.source_for(0, 0..total_points);
    let inside = count_inside(&mut source, total_points);
    let tally = Tally {
        inside,
        total: total_points,
    };

    info!(total_points, inside, estimate = tally.estimate(), "single-threaded estimate done");
    Ok(tally)
}
