use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::ops::Range;

/// One point drawn from the square `[-1, 1]²` and whether it landed in the unit circle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub inside: bool,
}

impl Sample {
    pub fn new(x: f64, y: f64) -> Self {
        Sample {
            x,
            y,
            inside: x * x + y * y <= 1.0,
        }
    }
}

/// Per-worker source of samples.
///
/// Every generator is seeded from OS entropy when it is created, so two
/// workers never share generator state and runs are not reproducible.
pub struct SampleGenerator {
    rng: StdRng,
    coord: Uniform<f64>,
}

impl SampleGenerator {
    pub fn from_entropy() -> Self {
        SampleGenerator {
            rng: StdRng::from_entropy(),
            coord: Uniform::new_inclusive(-1.0, 1.0),
        }
    }

    /// Writes a fresh sample into every index of `range` and nothing else.
    pub fn fill(&mut self, buffer: &mut [Sample], range: Range<usize>) {
        for slot in &mut buffer[range] {
            let x = self.coord.sample(&mut self.rng);
            let y = self.coord.sample(&mut self.rng);
            *slot = Sample::new(x, y);
        }
    }
}

/// Running count of samples seen and how many fell inside the circle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub total: u64,
    pub inside: u64,
}

impl Tally {
    pub fn record(&mut self, samples: &[Sample]) {
        self.total += samples.len() as u64;
        self.inside += samples.iter().filter(|s| s.inside).count() as u64;
    }

    /// `4 * inside / total`, or `None` before anything was recorded.
    pub fn ratio_estimate(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(4.0 * self.inside as f64 / self.total as f64)
    }

    /// Absolute distance of [`ratio_estimate`](Self::ratio_estimate) from π.
    pub fn pi_error(&self) -> Option<f64> {
        self.ratio_estimate()
            .map(|estimate| (estimate - std::f64::consts::PI).abs())
    }
}
