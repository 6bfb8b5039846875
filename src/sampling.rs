//! Sample generation shared by every estimator.
//!
//! Estimators never own a generator directly. They ask a [`SourceFactory`]
//! for one [`SampleSource`] per worker, build it on the worker's own thread
//! and drop it when the worker's range is done.

use std::ops::Range;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{EstimateError, Result};

/// A point drawn from the unit square `[0, 1) x [0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when the point lies in the unit quarter circle.
    #[inline]
    pub fn is_inside(&self) -> bool {
        self.x * self.x + self.y * self.y <= 1.0
    }
}

impl From<(f64, f64)> for Sample {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Draws two independent uniform values in `[0, 1)`.
///
/// Safe to call from many threads as long as each one passes its own `rng`.
#[inline]
pub fn draw_unit_square_point<R: Rng + ?Sized>(rng: &mut R) -> Sample {
    Sample {
        x: rng.gen::<f64>(),
        y: rng.gen::<f64>(),
    }
}

pub trait SampleSource {
    fn draw(&mut self) -> Sample;
}

/// Builds the sample source a worker uses for its share of the index range.
///
/// `indices` is the global range the worker will draw for, which lets
/// deterministic sources line up samples with their index no matter how the
/// range was split.
pub trait SourceFactory: Sync {
    type Source: SampleSource;

    fn source_for(&self, worker: usize, indices: Range<u64>) -> Self::Source;
}

/// Wraps any `rand` generator as a [`SampleSource`].
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> SampleSource for RngSource<R> {
    #[inline]
    fn draw(&mut self) -> Sample {
        draw_unit_square_point(&mut self.rng)
    }
}

// Linear Congruential Generator - same formula across all language ports
pub struct Lcg {
    seed: u32,
}

impl Lcg {
    const SCALE: f64 = (1u64 << 31) as f64;

    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    #[inline]
    fn next_unit(&mut self) -> f64 {
        self.seed = self.seed.wrapping_mul(1664525).wrapping_add(1013904223);
        (self.seed & 0x7FFF_FFFF) as f64 / Self::SCALE
    }
}

impl SampleSource for Lcg {
    #[inline]
    fn draw(&mut self) -> Sample {
        let x = self.next_unit();
        let y = self.next_unit();
        Sample { x, y }
    }
}

/// How each worker seeds its generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Seeding {
    /// Fresh OS entropy for every call and every worker.
    #[default]
    Entropy,
    /// `StdRng` seeded with `seed + worker`.
    Seeded(u64),
    /// The portable LCG, seeded with `seed + worker * 67890`.
    Lcg(u32),
}

pub enum Generator {
    Std(RngSource<StdRng>),
    Lcg(Lcg),
}

impl SampleSource for Generator {
    #[inline]
    fn draw(&mut self) -> Sample {
        match self {
            Generator::Std(source) => source.draw(),
            Generator::Lcg(lcg) => lcg.draw(),
        }
    }
}

impl SourceFactory for Seeding {
    type Source = Generator;

    fn source_for(&self, worker: usize, _indices: Range<u64>) -> Generator {
        match *self {
            Seeding::Entropy => Generator::Std(RngSource::new(StdRng::from_entropy())),
            Seeding::Seeded(seed) => Generator::Std(RngSource::new(StdRng::seed_from_u64(
                seed.wrapping_add(worker as u64),
            ))),
            Seeding::Lcg(seed) => {
                Generator::Lcg(Lcg::new(seed.wrapping_add((worker as u32).wrapping_mul(67890))))
            }
        }
    }
}

/// Replays a fixed sequence, where global index `i` always yields
/// `samples[i % len]`.
#[derive(Debug, Clone)]
pub struct Replay {
    samples: Arc<[Sample]>,
}

impl Replay {
    /// Fails with `InvalidArgument` when `samples` is empty.
    pub fn new<I, S>(samples: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Sample>,
    {
        let samples: Arc<[Sample]> = samples.into_iter().map(Into::into).collect();
        if samples.is_empty() {
            return Err(EstimateError::InvalidArgument(
                "replay needs at least one sample".to_string(),
            ));
        }
        Ok(Self { samples })
    }
}

pub struct ReplayCursor {
    samples: Arc<[Sample]>,
    next: u64,
}

impl SampleSource for ReplayCursor {
    fn draw(&mut self) -> Sample {
        let len = self.samples.len() as u64;
        let sample = self.samples[(self.next % len) as usize];
        self.next += 1;
        sample
    }
}

impl SourceFactory for Replay {
    type Source = ReplayCursor;

    fn source_for(&self, _worker: usize, indices: Range<u64>) -> ReplayCursor {
        ReplayCursor {
            samples: Arc::clone(&self.samples),
            next: indices.start,
        }
    }
}
