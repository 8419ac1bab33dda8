//! Frame-rate pacing over an injectable clock.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Upper bound on one sleep while waiting for a deadline.
pub const SLEEP_STEP: Duration = Duration::from_micros(100);

/// Source of time for the render loop.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when slept on or advanced.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Cell<Duration>,
    sleeps: Cell<usize>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Cell::new(Duration::ZERO),
            sleeps: Cell::new(0),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.offset.set(self.offset.get() + duration);
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }

    /// Number of sleep calls so far.
    pub fn sleeps(&self) -> usize {
        self.sleeps.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.advance(duration);
    }
}

/// Holds each tick to a minimum length derived from the frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePacer {
    interval: Option<Duration>,
}

impl FramePacer {
    /// `fps == 0` disables pacing. The interval is `1000 / fps` whole
    /// milliseconds.
    pub fn new(fps: u32) -> Self {
        let interval = (fps > 0).then(|| Duration::from_millis(u64::from(1000 / fps)));
        Self { interval }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Sleep in short steps until one interval has passed since
    /// `tick_start`.
    pub fn wait_until_deadline(&self, clock: &dyn Clock, tick_start: Instant) {
        let Some(interval) = self.interval else {
            return;
        };
        let deadline = tick_start + interval;
        loop {
            let now = clock.now();
            if now >= deadline {
                break;
            }
            clock.sleep((deadline - now).min(SLEEP_STEP));
        }
    }
}
