//! Clock abstraction and fixed-timestep accounting for the physics tick.
//!
//! Production code uses `SystemClock` (real time).
//! Tests use `TestClock` with manual time advancement.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Trait abstracting time sources for testability.
pub trait Clock: Send + Sync {
    /// Returns the current monotonic instant.
    fn now(&self) -> Instant;
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Test clock with manually controlled time.
pub struct TestClock {
    instant: Mutex<Instant>,
}

impl TestClock {
    /// Create a test clock starting at the current real time.
    pub fn new() -> Self {
        Self {
            instant: Mutex::new(Instant::now()),
        }
    }

    /// Advance time by the given duration.
    pub fn advance(&self, duration: Duration) {
        let mut inst = self.instant.lock().unwrap();
        *inst += duration;
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        *self.instant.lock().unwrap()
    }
}

/// Splits elapsed wall time into a whole number of fixed simulation steps.
///
/// Leftover time carries over to the next call. At most `max_substeps`
/// steps are produced per call; anything beyond that is discarded.
#[derive(Debug, Clone)]
pub struct FixedStepper {
    step: Duration,
    max_substeps: u32,
    accumulator: Duration,
}

impl FixedStepper {
    pub fn new(tick_hz: u32, max_substeps: u32) -> Self {
        Self {
            step: Duration::from_nanos(1_000_000_000 / u64::from(tick_hz.max(1))),
            max_substeps: max_substeps.max(1),
            accumulator: Duration::ZERO,
        }
    }

    /// Length of one simulation step.
    pub fn step(&self) -> Duration {
        self.step
    }

    /// Add `elapsed` and return how many steps to simulate now.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed;
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_substeps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if self.accumulator >= self.step {
            // Fell behind: drop the backlog instead of catching up.
            self.accumulator = Duration::ZERO;
        }
        steps
    }

    /// Time carried over to the next call.
    pub fn pending(&self) -> Duration {
        self.accumulator
    }
}

/// Pairs a clock with a `FixedStepper`, measuring time between ticks.
pub struct FrameTicker {
    clock: Arc<dyn Clock>,
    stepper: FixedStepper,
    last: Instant,
    started: Instant,
}

impl FrameTicker {
    pub fn new(clock: Arc<dyn Clock>, stepper: FixedStepper) -> Self {
        let now = clock.now();
        Self {
            clock,
            stepper,
            last: now,
            started: now,
        }
    }

    /// Number of fixed steps owed since the previous tick.
    pub fn tick(&mut self) -> u32 {
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(self.last);
        self.last = now;
        self.stepper.advance(elapsed)
    }

    pub fn step(&self) -> Duration {
        self.stepper.step()
    }

    /// Seconds per fixed step.
    pub fn step_secs(&self) -> f32 {
        self.stepper.step().as_secs_f32()
    }

    /// Time since the ticker was created, used for frame-done timestamps.
    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.started)
    }
}
