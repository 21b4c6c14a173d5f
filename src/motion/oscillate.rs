// src/motion/oscillate.rs - Back-and-forth stroke between two positions
use crate::motion::prediction::predict_move_duration;
use crate::motion::source::{inverse_lerp, lerp, Command, MotionSource, SourceContext};
use crate::params::{ParamChange, ParamRegistry, ParamValue};
use crate::scheduler::Countdown;

pub const MIN_POSITION: &str = "osc_min_position";
pub const MAX_POSITION: &str = "osc_max_position";
pub const SPEED: &str = "osc_speed";
pub const ANIMATION_OFFSET: &str = "osc_animation_offset";
pub const ANIMATION_TARGET: &str = "osc_animation_target";

/// Smallest allowed gap between the two stroke ends.
pub const MIN_STROKE: f32 = 20.0;
pub const DEFAULT_DIRECTION_CHANGE_DELAY: f32 = 0.02;

// Normalised drift tolerated before the animation clock is resynced.
const RESYNC_THRESHOLD: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    MovingUp,
    MovingDown,
}

impl Direction {
    fn reversed(self) -> Self {
        match self {
            Direction::MovingUp => Direction::MovingDown,
            Direction::MovingDown => Direction::MovingUp,
        }
    }
}

/// Oscillates between `osc_min_position` and `osc_max_position` at `osc_speed`,
/// reversing when the predicted travel time plus a short settle delay elapsed.
#[derive(Debug, Clone)]
pub struct OscillateSource {
    direction: Direction,
    timer: Countdown,
    direction_change_duration: f32,
    direction_change_delay: f32,
    last_overshoot: f32,
}

impl Default for OscillateSource {
    fn default() -> Self {
        Self::new(DEFAULT_DIRECTION_CHANGE_DELAY)
    }
}

impl OscillateSource {
    pub fn new(direction_change_delay: f32) -> Self {
        Self {
            direction: Direction::MovingDown,
            timer: Countdown::expired(),
            direction_change_duration: 0.0,
            direction_change_delay,
            last_overshoot: 0.0,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Length of the current half cycle, in seconds.
    pub fn direction_change_duration(&self) -> f32 {
        self.direction_change_duration
    }

    pub fn time_to_reversal(&self) -> f32 {
        self.timer.remaining()
    }

    /// Overshoot carried into the current half cycle.
    pub fn last_overshoot(&self) -> f32 {
        self.last_overshoot
    }

    fn stroke(params: &ParamRegistry) -> (f32, f32, f32) {
        let min = params.float(MIN_POSITION).unwrap_or(10.0);
        let max = params.float(MAX_POSITION).unwrap_or(80.0);
        let speed = params.float(SPEED).unwrap_or(30.0);
        (min, max, speed)
    }

    fn sync_animation(&self, new_pos: f32, ctx: &mut SourceContext<'_>) {
        let target = match ctx.params.choice(ANIMATION_TARGET) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => return,
        };
        let (min, max, _) = Self::stroke(ctx.params);
        let offset = ctx.params.float(ANIMATION_OFFSET).unwrap_or(0.0);

        let Some(clock) = ctx.host.animation_clock(&target) else {
            tracing::warn!("Animation target '{}' is gone, clearing selection", target);
            if let Err(e) = ctx.params.set(ANIMATION_TARGET, "") {
                tracing::warn!("Could not clear animation target: {}", e);
            }
            return;
        };

        let total = clock.total_time();
        if total <= 0.0 {
            return;
        }
        let norm_old = clock.current_time() / total;

        // First half of the animation is the upstroke, second half the downstroke.
        let stroke_pos = inverse_lerp(min, max, new_pos);
        let start = match self.direction {
            Direction::MovingUp => 0.0,
            Direction::MovingDown => total,
        };
        let new_time = (lerp(start, total * 0.5, stroke_pos) + total * offset) % total;

        if (new_time / total - norm_old).abs() > RESYNC_THRESHOLD {
            clock.set_current_time(new_time);
        }
        if self.direction_change_duration > 0.0 {
            clock.set_speed(total / (self.direction_change_duration * 2.0));
        }
    }
}

impl MotionSource for OscillateSource {
    fn name(&self) -> &'static str {
        "Oscillate"
    }

    fn configure(&mut self, params: &mut ParamRegistry) {
        params.register_float(MIN_POSITION, 10.0, 0.0, 99.0);
        params.register_float(MAX_POSITION, 80.0, 0.0, 99.0);
        params.register_float(SPEED, 30.0, 20.0, 80.0);
        params.register_float(ANIMATION_OFFSET, 0.0, 0.0, 0.5);
        params.register_choice(ANIMATION_TARGET, &[], "");
    }

    fn activate(&mut self, ctx: &mut SourceContext<'_>) {
        let targets = ctx.host.animation_targets();
        if let Err(e) = ctx.params.set_choices(ANIMATION_TARGET, targets) {
            tracing::warn!("Could not refresh animation targets: {}", e);
        }
        ctx.host.bind_param(MIN_POSITION, "Min Position");
        ctx.host.bind_param(MAX_POSITION, "Max Position");
        ctx.host.bind_param(SPEED, "Speed");
        ctx.host.bind_param(ANIMATION_TARGET, "Target Animation Pattern");
        ctx.host.bind_param(ANIMATION_OFFSET, "Animation Offset");

        self.direction = Direction::MovingDown;
        self.timer = Countdown::expired();
        self.direction_change_duration = 0.0;
        self.last_overshoot = 0.0;
    }

    fn on_config_changed(&mut self, change: &ParamChange, ctx: &mut SourceContext<'_>) {
        let ParamValue::Float(value) = change.value else {
            return;
        };
        let (min, max, _) = Self::stroke(ctx.params);
        let result = match change.name.as_str() {
            MIN_POSITION => ctx.params.set(MIN_POSITION, value.min(max - MIN_STROKE)),
            MAX_POSITION => ctx.params.set(MAX_POSITION, value.max(min + MIN_STROKE)),
            _ => return,
        };
        if let Err(e) = result {
            tracing::warn!("Could not enforce minimum stroke: {}", e);
        }
    }

    fn tick(&mut self, dt: f32, ctx: &mut SourceContext<'_>) -> Option<Command> {
        let overshoot = self.timer.advance(dt)?;

        self.direction = self.direction.reversed();

        let (min, max, speed) = Self::stroke(ctx.params);
        self.direction_change_duration =
            predict_move_duration(max - min, speed) + self.direction_change_delay;
        self.timer.rearm(self.direction_change_duration, overshoot);
        self.last_overshoot = overshoot;

        let position = match self.direction {
            Direction::MovingUp => max,
            Direction::MovingDown => min,
        };
        Some(Command::new(position, speed))
    }

    fn on_simulator_advance(
        &mut self,
        _prev_pos: f32,
        new_pos: f32,
        _dt: f32,
        ctx: &mut SourceContext<'_>,
    ) {
        self.sync_animation(new_pos, ctx);
    }

    fn deactivate(&mut self, ctx: &mut SourceContext<'_>) {
        ctx.host.unbind_param(MIN_POSITION);
        ctx.host.unbind_param(MAX_POSITION);
        ctx.host.unbind_param(SPEED);
        ctx.host.unbind_param(ANIMATION_OFFSET);
        ctx.host.unbind_param(ANIMATION_TARGET);
    }
}
