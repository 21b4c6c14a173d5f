// src/scheduler/mod.rs - Frame-rate independent timers
//! All timers count accumulated real seconds, never frames. When a countdown
//! expires part-way through a frame the overshoot is carried into the next
//! period so repeated expiries do not drift.

/// Countdown that reports expiry and carries the overshoot into the next period.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Countdown {
    remaining: f32,
}

impl Countdown {
    /// A countdown that expires on the first advance.
    pub fn expired() -> Self {
        Self { remaining: 0.0 }
    }

    pub fn new(period: f32) -> Self {
        Self { remaining: period }
    }

    /// Subtract `dt` seconds. Returns the overshoot (>= 0) when the countdown
    /// reached zero, otherwise `None`.
    pub fn advance(&mut self, dt: f32) -> Option<f32> {
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            Some(-self.remaining)
        } else {
            None
        }
    }

    /// Start the next period of length `period`, shortened by `overshoot`.
    /// The overshoot is capped at one full period.
    pub fn rearm(&mut self, period: f32, overshoot: f32) {
        self.remaining = period - period.min(overshoot);
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn reset(&mut self) {
        self.remaining = 0.0;
    }
}

/// Fixed-period trigger built on [`Countdown`], used to rate-limit work that
/// must not run every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalTimer {
    period: f32,
    countdown: Countdown,
}

impl IntervalTimer {
    /// The first call to [`IntervalTimer::tick`] fires.
    pub fn new(period: f32) -> Self {
        Self {
            period,
            countdown: Countdown::expired(),
        }
    }

    pub fn period(&self) -> f32 {
        self.period
    }

    /// Returns true at most once per call when a period boundary was crossed.
    pub fn tick(&mut self, dt: f32) -> bool {
        match self.countdown.advance(dt) {
            Some(overshoot) => {
                self.countdown.rearm(self.period, overshoot);
                true
            }
            None => false,
        }
    }
}
