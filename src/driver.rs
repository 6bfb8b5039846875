//! The interactive benchmark loop: read a point count and a thread count,
//! time both estimators, print four lines, repeat until `0`.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::blocking_pool::BlockingPool;
use crate::error::{EstimateError, Result};
use crate::multi_thread::tally_multi_thread;
use crate::sampling::Seeding;
use crate::single_thread::tally_single_thread;

/// One timed estimator call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunResult {
    pub estimate: f64,
    pub elapsed: Duration,
}

/// Times `run` and keeps its estimate.
pub fn timed<F>(run: F) -> Result<RunResult>
where
    F: FnOnce() -> Result<f64>,
{
    let start = Instant::now();
    let estimate = run()?;
    Ok(RunResult {
        estimate,
        elapsed: start.elapsed(),
    })
}

/// Which machinery runs the parallel estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// One scoped OS thread per worker.
    #[default]
    Threads,
    /// `spawn_blocking` tasks on a tokio pool capped at the worker count.
    /// The pool is built before the clock starts.
    BlockingPool,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Threads => write!(f, "threads"),
            Backend::BlockingPool => write!(f, "blocking-pool"),
        }
    }
}

/// Results of one benchmark round.
#[derive(Debug, Clone, Copy)]
pub struct Comparison {
    pub single: RunResult,
    pub multi: RunResult,
}

impl Comparison {
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Single-threaded Pi estimation: {}", self.single.estimate)?;
        writeln!(
            out,
            "Single-threaded computation time: {} seconds.",
            self.single.elapsed.as_secs_f64()
        )?;
        writeln!(out, "Multi-threaded Pi estimation: {}", self.multi.estimate)?;
        writeln!(
            out,
            "Multi-threaded computation time: {} seconds.",
            self.multi.elapsed.as_secs_f64()
        )
    }
}

/// Validated inputs for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRequest {
    pub points: u64,
    pub threads: usize,
}

impl RunRequest {
    /// Accepts the raw signed values a user typed.
    pub fn new(points: i64, threads: i64) -> Result<Self> {
        let points = u64::try_from(points)
            .ok()
            .filter(|&p| p > 0)
            .ok_or_else(|| {
                EstimateError::InvalidArgument(format!("points must be positive, got {points}"))
            })?;
        let threads = usize::try_from(threads)
            .ok()
            .filter(|&t| t > 0)
            .ok_or_else(|| {
                EstimateError::InvalidArgument(format!("threads must be positive, got {threads}"))
            })?;
        Ok(Self { points, threads })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Session {
    pub seeding: Seeding,
    pub backend: Backend,
}

impl Session {
    pub fn new(seeding: Seeding, backend: Backend) -> Self {
        Self { seeding, backend }
    }

    /// Runs the single-threaded and the parallel estimator back to back.
    pub fn compare(&self, request: RunRequest) -> Result<Comparison> {
        debug!(?request, backend = %self.backend, "starting round");

        let single = timed(|| {
            tally_single_thread(request.points, &self.seeding).map(|tally| tally.estimate())
        })?;
        let multi = match self.backend {
            Backend::Threads => timed(|| {
                tally_multi_thread(request.points, request.threads, &self.seeding)
                    .map(|tally| tally.estimate())
            })?,
            Backend::BlockingPool => {
                // Runtime start-up stays outside the measured section so both
                // backends time only the sampling work.
                let pool = BlockingPool::new(request.threads)?;
                timed(|| {
                    pool.tally(request.points, Arc::new(self.seeding))
                        .map(|tally| tally.estimate())
                })?
            }
        };

        Ok(Comparison { single, multi })
    }

    /// Prompts on `output` and reads answers from `input` until the user
    /// enters `0` or input runs out.
    ///
    /// A bad line or a failed round is reported and the loop carries on.
    pub fn run_interactive<R: BufRead, W: Write>(&self, input: R, output: &mut W) -> io::Result<()> {
        let mut lines = input.lines();

        loop {
            write!(output, "Enter the number of points (0 to exit): ")?;
            output.flush()?;
            let Some(points) = next_number(&mut lines, output)? else {
                break;
            };
            let Some(points) = points else { continue };
            if points == 0 {
                break;
            }

            write!(output, "Enter the number of threads: ")?;
            output.flush()?;
            let Some(threads) = next_number(&mut lines, output)? else {
                break;
            };
            let Some(threads) = threads else { continue };

            match RunRequest::new(points, threads).and_then(|request| self.compare(request)) {
                Ok(comparison) => comparison.write_to(output)?,
                Err(err) => {
                    warn!(%err, "round failed");
                    writeln!(output, "Error: {err}")?;
                }
            }
        }

        writeln!(output, "Exiting.")?;
        Ok(())
    }
}

/// Reads one integer. `None` means end of input; `Some(None)` means the line
/// did not parse and was already reported.
fn next_number<B: BufRead, W: Write>(
    lines: &mut io::Lines<B>,
    output: &mut W,
) -> io::Result<Option<Option<i64>>> {
    let Some(line) = lines.next().transpose()? else {
        writeln!(output)?;
        return Ok(None);
    };
    match line.trim().parse::<i64>() {
        Ok(n) => Ok(Some(Some(n))),
        Err(_) => {
            writeln!(output, "Error: expected an integer, got {:?}", line.trim())?;
            Ok(Some(None))
        }
    }
}
