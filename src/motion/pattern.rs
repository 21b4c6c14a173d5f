//! Looping keyframe playback.
//!
//! A pattern is a list of steps, each a normalised position and the time the
//! move towards it should take. Speeds come from the inverse response model,
//! so the device arrives on time whatever the stroke length.

use crate::motion::prediction::predict_move_speed_in;
use crate::motion::source::{lerp, Command, MotionSource, SourceContext};
use crate::params::{ParamChange, ParamRegistry};
use crate::scheduler::Countdown;

pub const MIN_POSITION: &str = "pattern_min_position";
pub const MAX_POSITION: &str = "pattern_max_position";
pub const TEMPO: &str = "pattern_tempo";
pub const PATTERN: &str = "pattern_name";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternStep {
    /// Target in `[0, 1]` of the configured stroke.
    pub position: f32,
    /// Seconds at tempo 1.0.
    pub duration: f32,
}

const fn step(position: f32, duration: f32) -> PatternStep {
    PatternStep { position, duration }
}

pub const WAVE: &[PatternStep] = &[step(1.0, 0.6), step(0.0, 0.6)];

pub const STUTTER: &[PatternStep] = &[
    step(1.0, 0.25),
    step(0.6, 0.15),
    step(1.0, 0.15),
    step(0.0, 0.45),
];

pub const RAMP: &[PatternStep] = &[
    step(0.4, 0.5),
    step(0.0, 0.5),
    step(0.7, 0.45),
    step(0.0, 0.45),
    step(1.0, 0.4),
    step(0.0, 0.4),
];

pub const PATTERNS: &[(&str, &[PatternStep])] =
    &[("wave", WAVE), ("stutter", STUTTER), ("ramp", RAMP)];

pub fn find_pattern(name: &str) -> Option<&'static [PatternStep]> {
    PATTERNS.iter().find(|(n, _)| *n == name).map(|(_, steps)| *steps)
}

#[derive(Debug, Clone, Default)]
pub struct PatternSource {
    steps: &'static [PatternStep],
    index: usize,
    timer: Countdown,
    /// Last issued target, in device units.
    position: Option<f32>,
}

impl PatternSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the step that will be issued next.
    pub fn next_step(&self) -> usize {
        self.index
    }

    fn load(&mut self, params: &ParamRegistry) {
        let name = params.choice(PATTERN).unwrap_or("wave");
        self.steps = find_pattern(name).unwrap_or(WAVE);
        self.index = 0;
        self.timer = Countdown::expired();
    }
}

impl MotionSource for PatternSource {
    fn name(&self) -> &'static str {
        "Pattern"
    }

    fn configure(&mut self, params: &mut ParamRegistry) {
        let names: Vec<&str> = PATTERNS.iter().map(|(n, _)| *n).collect();
        params.register_float(MIN_POSITION, 10.0, 0.0, 99.0);
        params.register_float(MAX_POSITION, 90.0, 0.0, 99.0);
        params.register_float(TEMPO, 1.0, 0.25, 4.0);
        params.register_choice(PATTERN, &names, "wave");
    }

    fn activate(&mut self, ctx: &mut SourceContext<'_>) {
        ctx.host.bind_param(PATTERN, "Pattern");
        ctx.host.bind_param(MIN_POSITION, "Min Position");
        ctx.host.bind_param(MAX_POSITION, "Max Position");
        ctx.host.bind_param(TEMPO, "Tempo");
        self.position = None;
        self.load(ctx.params);
    }

    fn on_config_changed(&mut self, change: &ParamChange, ctx: &mut SourceContext<'_>) {
        if change.name == PATTERN {
            tracing::info!("Switching pattern to {:?}", change.value);
            self.load(ctx.params);
        }
    }

    fn tick(&mut self, dt: f32, ctx: &mut SourceContext<'_>) -> Option<Command> {
        if self.steps.is_empty() {
            return None;
        }
        let overshoot = self.timer.advance(dt)?;

        let min = ctx.params.float(MIN_POSITION).unwrap_or(10.0);
        let max = ctx.params.float(MAX_POSITION).unwrap_or(90.0);
        let tempo = ctx.params.float(TEMPO).unwrap_or(1.0);

        let step = self.steps[self.index];
        self.index = (self.index + 1) % self.steps.len();

        let duration = step.duration / tempo;
        self.timer.rearm(duration, overshoot);

        let target = lerp(min, max, step.position).round();
        let prev = self.position.unwrap_or(min);
        self.position = Some(target);
        if (target - prev).abs() < 1.0 {
            // Nothing to move; the step still takes its time.
            return None;
        }

        let speed = predict_move_speed_in(prev, target, duration, ctx.speed_band);
        Some(Command::new(target, speed))
    }

    fn deactivate(&mut self, ctx: &mut SourceContext<'_>) {
        ctx.host.unbind_param(PATTERN);
        ctx.host.unbind_param(MIN_POSITION);
        ctx.host.unbind_param(MAX_POSITION);
        ctx.host.unbind_param(TEMPO);
    }
}
