// src/motion/controller.rs - Owns the active motion source and dispatches its commands
use crate::communication::{CommandLink, CommandTransport, TransportStats};
use crate::motion::source::{Command, MotionSource, SourceContext};
use crate::params::ParamChange;
use crate::simulator::{SimStep, Simulator};

/// What happened during one controller tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Command issued by the active source this frame.
    pub command: Option<Command>,
    /// Whether that command went out on the transport.
    pub transmitted: bool,
    pub sim: Option<SimStep>,
    pub inbound: Option<Vec<u8>>,
}

/// Registry of motion sources with exactly one active at a time.
///
/// Commands from the active source always retarget the simulator. They reach
/// the transport only while not paused and while a transport is attached.
pub struct MotionController<L: CommandLink> {
    sources: Vec<Box<dyn MotionSource>>,
    active: Option<usize>,
    desired: Option<usize>,
    paused: bool,
    position_max: u8,
    last_sent_position: u8,
    last_command: Option<Command>,
    simulator: Simulator,
    transport: Option<CommandTransport<L>>,
}

impl<L: CommandLink> MotionController<L> {
    pub fn new(sources: Vec<Box<dyn MotionSource>>, position_max: u8) -> Self {
        Self {
            sources,
            active: None,
            desired: None,
            paused: true,
            position_max,
            last_sent_position: 0,
            last_command: None,
            simulator: Simulator::new(position_max as f32),
            transport: None,
        }
    }

    pub fn attach_transport(&mut self, transport: CommandTransport<L>) {
        self.transport = Some(transport);
    }

    /// Detach the transport. After this no frame is sent until another one is attached.
    pub fn detach_transport(&mut self) -> Option<CommandTransport<L>> {
        self.transport.take()
    }

    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn source_index(&self, name: &str) -> Option<usize> {
        self.sources.iter().position(|s| s.name() == name)
    }

    /// Request a source by index. Takes effect at the start of the next tick.
    /// An out-of-range index leaves no source active.
    pub fn select(&mut self, index: Option<usize>) {
        self.desired = index;
    }

    pub fn select_by_name(&mut self, name: &str) {
        let index = self.source_index(name);
        if index.is_none() && !name.is_empty() {
            tracing::warn!("Unknown motion source '{}'", name);
        }
        self.select(index);
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_name(&self) -> Option<&'static str> {
        self.active.map(|i| self.sources[i].name())
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            tracing::info!("Device output {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    pub fn last_sent_position(&self) -> u8 {
        self.last_sent_position
    }

    pub fn last_command(&self) -> Option<Command> {
        self.last_command
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn transport_stats(&self) -> Option<&TransportStats> {
        self.transport.as_ref().map(|t| t.stats())
    }

    /// Run `configure` on every registered source.
    pub fn configure_sources(&mut self, params: &mut crate::params::ParamRegistry) {
        for source in &mut self.sources {
            source.configure(params);
        }
    }

    /// Forward a parameter change to the active source.
    pub fn forward_change(&mut self, change: &ParamChange, ctx: &mut SourceContext<'_>) {
        if let Some(index) = self.active {
            self.sources[index].on_config_changed(change, ctx);
        }
    }

    /// Apply a pending selection now: deactivate the current source, then
    /// activate the desired one. `tick` does this itself; call it earlier when
    /// changes must reach the newly selected source in the same frame.
    pub fn reconcile(&mut self, ctx: &mut SourceContext<'_>) {
        if self.desired == self.active {
            return;
        }
        if let Some(index) = self.active.take() {
            tracing::info!("Deactivating motion source {}", self.sources[index].name());
            self.sources[index].deactivate(ctx);
        }
        match self.desired {
            Some(index) if index < self.sources.len() => {
                tracing::info!("Activating motion source {}", self.sources[index].name());
                self.sources[index].activate(ctx);
                self.active = Some(index);
            }
            Some(index) => {
                tracing::warn!("No motion source at index {}", index);
                self.desired = None;
            }
            None => {}
        }
    }

    /// One scheduling frame: switch sources if requested, tick the active
    /// source, dispatch its command, poll inbound, then integrate the simulator.
    pub fn tick(&mut self, dt: f32, ctx: &mut SourceContext<'_>) -> TickReport {
        let mut report = TickReport::default();
        self.reconcile(ctx);

        if let Some(index) = self.active {
            if let Some(command) = self.sources[index].tick(dt, ctx) {
                let command = command.with_position_max(self.position_max);
                report.transmitted = self.dispatch(command);
                report.command = Some(command);
            }
        }

        if let Some(transport) = self.transport.as_mut() {
            report.inbound = transport.poll_inbound(dt);
        }

        let step = self.simulator.advance(dt);
        if let Some(index) = self.active {
            let source = &mut self.sources[index];
            source.on_simulator_advance(step.prev_position, step.new_position, step.dt, ctx);
        }
        report.sim = Some(step);
        report
    }

    fn dispatch(&mut self, command: Command) -> bool {
        self.last_command = Some(command);
        self.simulator.set_target(command.position as f32, command.speed as f32);

        if self.paused {
            return false;
        }
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };
        match transport.send(command, self.last_sent_position) {
            Ok(_) => {
                self.last_sent_position = command.position;
                true
            }
            Err(e) => {
                tracing::warn!("Failed to send command {:?}: {}", command, e);
                false
            }
        }
    }

    /// Deactivate the active source and release the transport. Safe to call twice.
    pub fn shutdown(&mut self, ctx: &mut SourceContext<'_>) -> Option<CommandTransport<L>> {
        if let Some(index) = self.active.take() {
            tracing::info!("Deactivating motion source {}", self.sources[index].name());
            self.sources[index].deactivate(ctx);
        }
        self.desired = None;
        self.transport.take()
    }
}

impl<L: CommandLink> std::fmt::Debug for MotionController<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionController")
            .field("sources", &self.source_names())
            .field("active", &self.active)
            .field("paused", &self.paused)
            .field("last_sent_position", &self.last_sent_position)
            .field("transport", &self.transport)
            .finish()
    }
}
