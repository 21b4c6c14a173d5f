//! Pluggable generators of motion commands.

use crate::host::HostBindings;
use crate::motion::prediction::{SpeedBand, POSITION_MAX};
use crate::params::{ParamChange, ParamRegistry};

/// Unit of intent sent to the device: where to go and how fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    pub position: u8,
    pub speed: u8,
}

impl Command {
    /// Build a command from continuous values. Position is clamped to the
    /// device range; speed is truncated and saturated to a byte only.
    pub fn new(position: f32, speed: f32) -> Self {
        Self {
            position: position.clamp(0.0, POSITION_MAX) as u8,
            speed: speed.clamp(0.0, u8::MAX as f32) as u8,
        }
    }

    pub fn with_position_max(self, position_max: u8) -> Self {
        Self {
            position: self.position.min(position_max),
            ..self
        }
    }
}

/// Everything a source may touch while the driver calls into it.
pub struct SourceContext<'a> {
    pub params: &'a mut ParamRegistry,
    pub host: &'a mut dyn HostBindings,
    pub speed_band: SpeedBand,
}

/// Capability set shared by every motion source.
///
/// `configure` runs once at startup for every source so saved parameter values
/// can be restored even for sources that never become active. The remaining
/// methods are only called on the active source, bracketed by `activate` and
/// `deactivate`.
pub trait MotionSource: Send {
    /// Name used by the source selector.
    fn name(&self) -> &'static str;

    /// Declare tunable parameters.
    fn configure(&mut self, params: &mut ParamRegistry);

    /// Bind host controls and reset internal timers.
    fn activate(&mut self, ctx: &mut SourceContext<'_>);

    /// A parameter changed since the last frame.
    fn on_config_changed(&mut self, _change: &ParamChange, _ctx: &mut SourceContext<'_>) {}

    /// Advance by `dt` seconds. Returns a command when a new target should be issued.
    fn tick(&mut self, dt: f32, ctx: &mut SourceContext<'_>) -> Option<Command>;

    /// Simulated motion for this frame, for effects that must follow the real
    /// travel rather than the intended one.
    fn on_simulator_advance(
        &mut self,
        _prev_pos: f32,
        _new_pos: f32,
        _dt: f32,
        _ctx: &mut SourceContext<'_>,
    ) {
    }

    /// Release whatever `activate` bound.
    fn deactivate(&mut self, ctx: &mut SourceContext<'_>);
}

pub(crate) fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() < f32::EPSILON {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}
