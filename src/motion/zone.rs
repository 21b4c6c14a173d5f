// src/motion/zone.rs - Follow a host-supplied normalised input
use crate::motion::prediction::predict_move_speed_in;
use crate::motion::source::{lerp, Command, MotionSource, SourceContext};
use crate::params::ParamRegistry;

pub const INPUT: &str = "zone_input";
pub const MIN_POSITION: &str = "zone_min_position";
pub const MAX_POSITION: &str = "zone_max_position";
pub const UPDATE_INTERVAL: &str = "zone_update_interval";
pub const DEADBAND: &str = "zone_deadband";

/// Tracks `zone_input` (0..1, written by the host) inside the configured range.
///
/// Commands are rate limited to one per `zone_update_interval` and only issued
/// when the target is at least `zone_deadband` units away from where the
/// simulator says the device actually is.
#[derive(Debug, Clone, Default)]
pub struct ZoneSource {
    since_last_command: f32,
    simulated_position: f32,
}

impl ZoneSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn simulated_position(&self) -> f32 {
        self.simulated_position
    }
}

impl MotionSource for ZoneSource {
    fn name(&self) -> &'static str {
        "Zone"
    }

    fn configure(&mut self, params: &mut ParamRegistry) {
        params.register_float(INPUT, 0.0, 0.0, 1.0);
        params.register_float(MIN_POSITION, 5.0, 0.0, 99.0);
        params.register_float(MAX_POSITION, 95.0, 0.0, 99.0);
        params.register_float(UPDATE_INTERVAL, 0.1, 0.05, 1.0);
        params.register_float(DEADBAND, 2.0, 0.0, 20.0);
    }

    fn activate(&mut self, ctx: &mut SourceContext<'_>) {
        ctx.host.bind_param(MIN_POSITION, "Min Position");
        ctx.host.bind_param(MAX_POSITION, "Max Position");
        ctx.host.bind_param(UPDATE_INTERVAL, "Update Interval");
        ctx.host.bind_param(DEADBAND, "Deadband");
        self.since_last_command = f32::MAX;
    }

    fn tick(&mut self, dt: f32, ctx: &mut SourceContext<'_>) -> Option<Command> {
        self.since_last_command += dt;

        let interval = ctx.params.float(UPDATE_INTERVAL).unwrap_or(0.1);
        if self.since_last_command < interval {
            return None;
        }

        let input = ctx.params.float(INPUT).unwrap_or(0.0);
        let min = ctx.params.float(MIN_POSITION).unwrap_or(5.0);
        let max = ctx.params.float(MAX_POSITION).unwrap_or(95.0);
        let deadband = ctx.params.float(DEADBAND).unwrap_or(2.0);

        let target = lerp(min, max, input).round();
        let distance = (target - self.simulated_position).abs();
        if distance < deadband.max(1.0) {
            return None;
        }

        // Aim to arrive by the time the next update may be issued.
        let from = self.simulated_position;
        let speed = predict_move_speed_in(from, target, interval, ctx.speed_band);
        self.since_last_command = 0.0;
        Some(Command::new(target, speed))
    }

    fn on_simulator_advance(
        &mut self,
        _prev_pos: f32,
        new_pos: f32,
        _dt: f32,
        _ctx: &mut SourceContext<'_>,
    ) {
        self.simulated_position = new_pos;
    }

    fn deactivate(&mut self, ctx: &mut SourceContext<'_>) {
        ctx.host.unbind_param(MIN_POSITION);
        ctx.host.unbind_param(MAX_POSITION);
        ctx.host.unbind_param(UPDATE_INTERVAL);
        ctx.host.unbind_param(DEADBAND);
    }
}
