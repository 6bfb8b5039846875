//! Monte Carlo estimation of π, single-threaded and split across workers,
//! plus the timing loop that compares the two.

pub mod blocking_pool;
pub mod driver;
pub mod error;
pub mod multi_thread;
pub mod sampling;
pub mod single_thread;
pub mod tally;

pub use blocking_pool::{tally_blocking_pool, BlockingPool};
pub use driver::{Backend, Comparison, RunRequest, RunResult, Session};
pub use error::{EstimateError, Result};
pub use multi_thread::{blocks, estimate_pi_multi_thread, partition, tally_multi_thread};
pub use sampling::{draw_unit_square_point, Replay, Sample, SampleSource, Seeding, SourceFactory};
pub use single_thread::{estimate_pi_single_thread, tally_single_thread};
pub use tally::Tally;
