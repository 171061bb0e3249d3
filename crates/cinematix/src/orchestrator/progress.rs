use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Progress shown while the frame is sampled and analyzed.
pub const ANALYZING_PROGRESS: u8 = 10;
/// Progress at the Analyzing -> Processing boundary.
pub const PROCESSING_START_PROGRESS: u8 = 35;
pub const COMPLETE_PROGRESS: u8 = 100;

/// Supplies the per-tick progress increment.
pub trait IncrementSource: Send {
    fn next_increment(&mut self) -> f64;
}

/// Builds a fresh increment source for each operation.
pub type IncrementFactory = Arc<dyn Fn() -> Box<dyn IncrementSource> + Send + Sync>;

/// Uniform increments in `[0, max)`.
pub struct RandomIncrements {
    rng: StdRng,
    max: f64,
}

impl RandomIncrements {
    pub fn new(max: f64) -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            max,
        }
    }

    pub fn seeded(max: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            max,
        }
    }

    pub fn factory(max: f64) -> IncrementFactory {
        Arc::new(move || Box::new(RandomIncrements::new(max)) as Box<dyn IncrementSource>)
    }
}

impl IncrementSource for RandomIncrements {
    fn next_increment(&mut self) -> f64 {
        if self.max <= 0.0 {
            return 0.0;
        }
        self.rng.random_range(0.0..self.max)
    }
}

/// Repeats the same increment every tick.
pub struct FixedIncrements(pub f64);

impl FixedIncrements {
    pub fn factory(step: f64) -> IncrementFactory {
        Arc::new(move || Box::new(FixedIncrements(step)) as Box<dyn IncrementSource>)
    }
}

impl IncrementSource for FixedIncrements {
    fn next_increment(&mut self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still running; carries the floored progress.
    Advanced(u8),
    /// Reached 100.
    Finished,
}

/// Accumulates increments on top of the processing start value.
pub struct ProgressSimulator {
    accumulator: f64,
    source: Box<dyn IncrementSource>,
}

impl ProgressSimulator {
    pub fn new(start: u8, source: Box<dyn IncrementSource>) -> Self {
        Self {
            accumulator: f64::from(start),
            source,
        }
    }

    pub fn tick(&mut self) -> Tick {
        let increment = self.source.next_increment();
        if increment.is_finite() && increment > 0.0 {
            self.accumulator += increment;
        }

        if self.accumulator >= f64::from(COMPLETE_PROGRESS) {
            Tick::Finished
        } else {
            Tick::Advanced(self.accumulator.floor() as u8)
        }
    }

    pub fn progress(&self) -> u8 {
        self.accumulator.min(f64::from(COMPLETE_PROGRESS)).floor() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_increments_reach_completion() {
        let mut sim = ProgressSimulator::new(PROCESSING_START_PROGRESS, Box::new(FixedIncrements(5.0)));

        let mut seen = Vec::new();
        loop {
            match sim.tick() {
                Tick::Advanced(p) => seen.push(p),
                Tick::Finished => break,
            }
        }

        assert_eq!(seen.first(), Some(&40));
        assert_eq!(seen.last(), Some(&95));
        assert_eq!(seen.len(), 12);
        assert_eq!(sim.progress(), 100);
    }

    #[test]
    fn test_fractional_progress_is_floored() {
        let mut sim = ProgressSimulator::new(PROCESSING_START_PROGRESS, Box::new(FixedIncrements(0.7)));
        assert_eq!(sim.tick(), Tick::Advanced(35));
        assert_eq!(sim.tick(), Tick::Advanced(36));
        assert_eq!(sim.tick(), Tick::Advanced(37));
    }

    #[test]
    fn test_random_increments_bounded_and_monotonic() {
        let mut increments = RandomIncrements::seeded(8.0, 42);
        for _ in 0..1000 {
            let inc = increments.next_increment();
            assert!((0.0..8.0).contains(&inc));
        }

        let mut sim =
            ProgressSimulator::new(PROCESSING_START_PROGRESS, Box::new(RandomIncrements::seeded(8.0, 7)));
        let mut last = PROCESSING_START_PROGRESS;
        let mut ticks = 0;
        loop {
            ticks += 1;
            match sim.tick() {
                Tick::Advanced(p) => {
                    assert!(p >= last);
                    assert!(p < 100);
                    last = p;
                }
                Tick::Finished => break,
            }
            assert!(ticks < 10_000);
        }
    }

    #[test]
    fn test_negative_increment_ignored() {
        let mut sim = ProgressSimulator::new(50, Box::new(FixedIncrements(-3.0)));
        assert_eq!(sim.tick(), Tick::Advanced(50));
    }

    #[test]
    fn test_zero_max_never_advances() {
        let mut increments = RandomIncrements::seeded(0.0, 1);
        assert_eq!(increments.next_increment(), 0.0);
    }
}
