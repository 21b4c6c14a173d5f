//! Local stand-in for the device.
//!
//! Integrates a position towards the last commanded target at the rate the
//! response model predicts for the commanded speed. Runs whether or not the
//! command actually reached the device.

use crate::motion::prediction::{predict_distance_traveled, POSITION_MAX};

/// Result of one integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimStep {
    pub prev_position: f32,
    pub new_position: f32,
    pub dt: f32,
}

#[derive(Debug, Clone)]
pub struct Simulator {
    position: f32,
    target: f32,
    speed: f32,
    position_max: f32,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(POSITION_MAX)
    }
}

impl Simulator {
    pub fn new(position_max: f32) -> Self {
        Self {
            position: 0.0,
            target: 0.0,
            speed: 0.0,
            position_max,
        }
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// New target from the last issued command. The position is clamped to the
    /// position range, the speed only to what a command byte can carry.
    pub fn set_target(&mut self, position: f32, speed: f32) {
        self.target = position.clamp(0.0, self.position_max);
        self.speed = speed.clamp(0.0, u8::MAX as f32);
    }

    /// Move at most the predicted travel for `dt` towards the target, never past it.
    pub fn advance(&mut self, dt: f32) -> SimStep {
        let prev_position = self.position;
        let max_delta = predict_distance_traveled(self.speed, dt.max(0.0));
        self.position = move_towards(prev_position, self.target, max_delta);
        SimStep {
            prev_position,
            new_position: self.position,
            dt,
        }
    }
}

/// Step `current` towards `target` by at most `max_delta`, landing exactly on the target.
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}
