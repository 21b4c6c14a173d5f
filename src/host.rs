//! Host adapter seam.
//!
//! The core never draws widgets or looks up scene objects itself. Everything
//! the surrounding application provides goes through [`HostBindings`]; a
//! headless implementation backed by `tracing` is included for the CLI host.

use std::collections::BTreeMap;

use crate::config::AnimationConfig;

/// Playback clock of an animation the host can drive from simulated motion.
pub trait AnimationClock {
    fn total_time(&self) -> f32;
    fn current_time(&self) -> f32;
    fn set_current_time(&mut self, time: f32);
    fn set_speed(&mut self, speed: f32);
}

/// Services the host application offers to motion sources.
pub trait HostBindings {
    /// Show a control bound to parameter `name`.
    fn bind_param(&mut self, _name: &str, _label: &str) {}

    /// Remove the control bound to parameter `name`.
    fn unbind_param(&mut self, _name: &str) {}

    /// Names of animations that can be targeted.
    fn animation_targets(&self) -> Vec<String> {
        Vec::new()
    }

    fn animation_clock(&mut self, _target: &str) -> Option<&mut dyn AnimationClock> {
        None
    }

    /// Called once at the end of every frame.
    fn on_frame(&mut self, _dt: f32) {}
}

/// Looping clock advanced by the headless host every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopClock {
    total_time: f32,
    current_time: f32,
    speed: f32,
}

impl LoopClock {
    pub fn new(total_time: f32) -> Self {
        Self {
            total_time,
            current_time: 0.0,
            speed: 1.0,
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn advance(&mut self, dt: f32) {
        if self.total_time <= 0.0 {
            return;
        }
        self.current_time = (self.current_time + dt * self.speed).rem_euclid(self.total_time);
    }
}

impl AnimationClock for LoopClock {
    fn total_time(&self) -> f32 {
        self.total_time
    }

    fn current_time(&self) -> f32 {
        self.current_time
    }

    fn set_current_time(&mut self, time: f32) {
        self.current_time = time;
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }
}

/// Host used when running without a graphical application.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    bound: Vec<String>,
    clocks: BTreeMap<String, LoopClock>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(animations: &[AnimationConfig]) -> Self {
        let mut host = Self::new();
        for animation in animations {
            host.add_clock(&animation.name, LoopClock::new(animation.total_time));
        }
        host
    }

    pub fn add_clock(&mut self, name: &str, clock: LoopClock) {
        self.clocks.insert(name.to_string(), clock);
    }

    pub fn clock(&self, name: &str) -> Option<&LoopClock> {
        self.clocks.get(name)
    }

    pub fn bound_params(&self) -> &[String] {
        &self.bound
    }
}

impl HostBindings for HeadlessHost {
    fn bind_param(&mut self, name: &str, label: &str) {
        tracing::debug!("Binding control '{}' to {}", label, name);
        if !self.bound.iter().any(|b| b == name) {
            self.bound.push(name.to_string());
        }
    }

    fn unbind_param(&mut self, name: &str) {
        tracing::debug!("Unbinding control for {}", name);
        self.bound.retain(|b| b != name);
    }

    fn animation_targets(&self) -> Vec<String> {
        self.clocks.keys().cloned().collect()
    }

    fn animation_clock(&mut self, target: &str) -> Option<&mut dyn AnimationClock> {
        self.clocks.get_mut(target).map(|c| c as &mut dyn AnimationClock)
    }

    fn on_frame(&mut self, dt: f32) {
        for clock in self.clocks.values_mut() {
            clock.advance(dt);
        }
    }
}
