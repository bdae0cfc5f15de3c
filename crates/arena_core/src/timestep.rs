//! Fixed-timestep driver.
//!
//! Frames arrive at whatever rate the host runs; the simulation only ever
//! advances in whole ticks. [`FixedTimestep`] accumulates elapsed time and
//! reports how many ticks are due, capped so a long stall cannot trigger a
//! burst of catch-up work.

use std::time::Duration;

/// Accumulates wall-clock time into whole simulation ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedTimestep {
    step: Duration,
    accumulator: Duration,
    max_steps: u32,
}

impl FixedTimestep {
    /// Driver for `tick_rate` ticks per second running at most `max_steps`
    /// ticks per frame.
    #[must_use]
    pub fn new(tick_rate: u32, max_steps: u32) -> Self {
        let rate = u64::from(tick_rate.max(1));
        Self {
            step: Duration::from_nanos(1_000_000_000 / rate),
            accumulator: Duration::ZERO,
            max_steps: max_steps.max(1),
        }
    }

    /// Length of one tick.
    #[must_use]
    pub const fn step(&self) -> Duration {
        self.step
    }

    /// Time carried over to the next frame.
    #[must_use]
    pub const fn pending(&self) -> Duration {
        self.accumulator
    }

    /// Add a frame's elapsed time and return the number of ticks to run.
    ///
    /// When more than `max_steps` ticks are due, the extra time is dropped.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed;
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == self.max_steps && self.accumulator >= self.step {
            tracing::trace!(
                dropped_ms = self.accumulator.as_millis(),
                "Timestep fell behind, dropping time"
            );
            self.accumulator = Duration::ZERO;
        }
        steps
    }

    /// Blend factor of the leftover time within the next tick, in `[0, 1)`.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.accumulator.as_secs_f64() / self.step.as_secs_f64()
    }

    /// Forget accumulated time.
    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }
}
