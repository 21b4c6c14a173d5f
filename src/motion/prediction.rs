//! Empirical response model for the stroke actuator.
//!
//! The device does not move linearly: the time a move takes depends on the
//! distance and on the commanded speed through a fitted power law. These
//! functions convert between distance, speed and duration using that fit.
//!
//! Reference fit: <https://github.com/funjack/launchcontrol/blob/master/protocol/funscript/functions.go>

use serde::{Deserialize, Serialize};

/// Highest addressable device position.
pub const POSITION_MAX: f32 = 99.0;
/// Lowest speed the inverse model will ever report.
pub const SPEED_MIN: f32 = 10.0;
/// Highest speed the inverse model will ever report.
pub const SPEED_MAX: f32 = 90.0;

const SPEED_SCALE: f64 = 25000.0;
const FULL_STROKE: f64 = 90.0;
const SPEED_EXPONENT: f64 = -1.05;
const DURATION_EXPONENT: f64 = -0.95;

/// Saturation band applied to speeds derived from the inverse model.
/// Independent of the position range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedBand {
    pub min: f32,
    pub max: f32,
}

impl Default for SpeedBand {
    fn default() -> Self {
        Self {
            min: SPEED_MIN,
            max: SPEED_MAX,
        }
    }
}

impl SpeedBand {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, speed: f32) -> f32 {
        speed.clamp(self.min, self.max)
    }
}

/// Speed setting that reproduces a move from `prev_pos` to `curr_pos` taking
/// `duration_secs`, saturated to the default [`SpeedBand`].
///
/// The distance between the two positions must be non-zero; callers guard that.
pub fn predict_move_speed(prev_pos: f32, curr_pos: f32, duration_secs: f32) -> f32 {
    predict_move_speed_in(prev_pos, curr_pos, duration_secs, SpeedBand::default())
}

/// Same as [`predict_move_speed`] but saturating to `band`.
pub fn predict_move_speed_in(
    prev_pos: f32,
    curr_pos: f32,
    duration_secs: f32,
    band: SpeedBand,
) -> f32 {
    let duration_ms = duration_secs as f64 * 1e3;
    let distance = (curr_pos as f64 - prev_pos as f64).abs();

    let millis_per_unit = duration_ms * FULL_STROKE / distance;
    let speed = SPEED_SCALE * millis_per_unit.powf(SPEED_EXPONENT);

    band.clamp(speed as f32)
}

/// Seconds the device needs to cover `distance` at `speed`. Zero for `distance <= 0`.
pub fn predict_move_duration(distance: f32, speed: f32) -> f32 {
    if distance <= 0.0 {
        return 0.0;
    }

    let millis_per_unit = full_stroke_millis(speed);
    let duration = millis_per_unit / (FULL_STROKE / distance as f64) / 1e3;
    duration as f32
}

/// Units travelled in `duration_secs` at `speed`. Zero for `speed <= 0`.
pub fn predict_distance_traveled(speed: f32, duration_secs: f32) -> f32 {
    if speed <= 0.0 {
        return 0.0;
    }

    let millis_per_unit = full_stroke_millis(speed);
    let remaining = millis_per_unit - duration_secs as f64 * 1e3;
    let distance = FULL_STROKE - (remaining / millis_per_unit * FULL_STROKE);
    distance as f32
}

// Milliseconds a full stroke takes at `speed`.
fn full_stroke_millis(speed: f32) -> f64 {
    (speed as f64 / SPEED_SCALE).powf(DURATION_EXPONENT)
}
