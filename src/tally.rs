use crate::sampling::SampleSource;

/// Raw counts behind an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub inside: u64,
    pub total: u64,
}

impl Tally {
    /// `4 * inside / total`. Callers make sure `total` is non-zero.
    pub fn estimate(&self) -> f64 {
        4.0 * self.inside as f64 / self.total as f64
    }
}

/// Draws `samples` points from `source` and counts the ones inside the circle.
pub fn count_inside<S: SampleSource + ?Sized>(source: &mut S, samples: u64) -> u64 {
    let mut inside = 0;
    for _ in 0..samples {
        if source.draw().is_inside() {
            inside += 1;
        }
    }
    inside
}
