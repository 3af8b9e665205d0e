//! Randomized delays for retry loops.

use rand::Rng;
use std::time::Duration;

/// A delay drawn uniformly from `[min, max]` on every use.
///
/// Spreading retries keeps many partition workers from hammering their nodes in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitteredDelay {
    min: Duration,
    max: Duration,
}

impl JitteredDelay {
    /// Creates a delay between `min` and `max`, both inclusive.
    ///
    /// Returns `None` when `min` exceeds `max`.
    pub fn new(min: Duration, max: Duration) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    /// A delay that is always `delay`.
    pub const fn fixed(delay: Duration) -> Self {
        Self { min: delay, max: delay }
    }

    /// The shortest delay.
    pub const fn min(&self) -> Duration {
        self.min
    }

    /// The longest delay.
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Draws the next delay.
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::rng().random_range(self.min..=self.max)
    }
}
