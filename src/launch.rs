// src/launch.rs - Driver that ties sources, transport, simulator and host together
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::time::{Duration, Instant, MissedTickBehavior};

use crate::communication::{CommandLink, CommandTransport, TransportError};
use crate::config::{
    Config, ConfigError, MotionConfig, NetworkConfig, MAX_FRAME_RATE, MIN_FRAME_RATE,
};
use crate::host::HostBindings;
use crate::motion::controller::{MotionController, TickReport};
use crate::motion::prediction::SpeedBand;
use crate::motion::source::{MotionSource, SourceContext};
use crate::motion::{OscillateSource, PatternSource, ZoneSource};
use crate::params::{ParamRegistry, ParamValue};
use crate::scheduler::IntervalTimer;

/// Selector for the active motion source, by name. Empty means none.
pub const MOTION_SOURCE: &str = "motion_source";
/// While true, commands are simulated but not transmitted.
pub const PAUSED: &str = "paused";
/// Simulated device position, published every frame.
pub const SIMULATOR_POSITION: &str = "simulator_position";

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Only one launch driver can be active at a time")]
    AlreadyRunning,
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// The motion sources every driver offers, in selector order.
pub fn default_sources(motion: &MotionConfig) -> Vec<Box<dyn MotionSource>> {
    vec![
        Box::new(OscillateSource::new(motion.direction_change_delay)),
        Box::new(PatternSource::new()),
        Box::new(ZoneSource::new()),
    ]
}

/// Constructs drivers and refuses a second one while the first is alive.
///
/// Clones share the guard, so hand a clone to every place that may try to start one.
#[derive(Debug, Clone, Default)]
pub struct Bootstrap {
    running: Arc<AtomicBool>,
}

#[derive(Debug)]
struct InstanceLease {
    running: Arc<AtomicBool>,
}

impl Drop for InstanceLease {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

impl Bootstrap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn acquire(&self) -> Result<InstanceLease, LaunchError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::error!("You can only have one launch driver active!");
            return Err(LaunchError::AlreadyRunning);
        }
        Ok(InstanceLease {
            running: self.running.clone(),
        })
    }

    /// Start a driver. `connect` is only called once the instance guard is
    /// held and the configuration validated, so a rejected start never opens
    /// sockets.
    pub fn start<L, F>(
        &self,
        config: &Config,
        connect: F,
        host: Box<dyn HostBindings>,
    ) -> Result<LaunchDriver<L>, LaunchError>
    where
        L: CommandLink,
        F: FnOnce(&NetworkConfig) -> Result<L, TransportError>,
    {
        let lease = self.acquire()?;
        config.validate()?;

        let mut params = ParamRegistry::with_saved(config.params.clone());
        let sources = default_sources(&config.motion);
        let mut controller = MotionController::new(sources, config.limits.position_max);

        let names = controller.source_names();
        let source = config.motion.source.as_str();
        if !source.is_empty() && !names.contains(&source) {
            return Err(LaunchError::Config(ConfigError::Invalid(format!(
                "motion.source '{}' is not one of {:?}",
                source, names
            ))));
        }
        params.register_choice(MOTION_SOURCE, &names, &config.motion.source);
        params.register_bool(PAUSED, config.motion.paused);
        let position_max = config.limits.position_max as f32;
        params.register_float(SIMULATOR_POSITION, 0.0, 0.0, position_max);
        controller.configure_sources(&mut params);

        controller.select_by_name(params.choice(MOTION_SOURCE).unwrap_or_default());
        controller.set_paused(params.flag(PAUSED).unwrap_or(true));

        match connect(&config.network) {
            Ok(link) => {
                let transport = CommandTransport::new(link, config.network.poll_interval);
                controller.attach_transport(transport);
                tracing::info!("Device link established.");
            }
            Err(e) if config.network.required => return Err(LaunchError::Transport(e)),
            Err(e) => tracing::warn!("Device link unavailable, running simulation only: {}", e),
        }

        Ok(LaunchDriver {
            controller,
            params,
            host,
            speed_band: config.limits.speed_band(),
            shut_down: false,
            _lease: lease,
        })
    }
}

/// Entry point driven by the host once per frame through [`LaunchDriver::tick`].
pub struct LaunchDriver<L: CommandLink> {
    controller: MotionController<L>,
    params: ParamRegistry,
    host: Box<dyn HostBindings>,
    speed_band: SpeedBand,
    shut_down: bool,
    _lease: InstanceLease,
}

impl<L: CommandLink> LaunchDriver<L> {
    /// Advance everything by `dt` seconds.
    ///
    /// Queued changes are applied first. A source switch requested this frame
    /// takes effect before the remaining changes are forwarded, so they reach
    /// the newly selected source.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        if self.shut_down {
            return TickReport::default();
        }

        let changes = self.params.drain_changes();
        let mut forwarded = Vec::with_capacity(changes.len());
        for change in changes {
            match (change.name.as_str(), &change.value) {
                (MOTION_SOURCE, ParamValue::Choice(name)) => {
                    self.controller.select_by_name(name);
                    continue;
                }
                (PAUSED, ParamValue::Bool(paused)) => {
                    self.controller.set_paused(*paused);
                    continue;
                }
                _ => {}
            }
            forwarded.push(change);
        }

        let mut ctx = SourceContext {
            params: &mut self.params,
            host: self.host.as_mut(),
            speed_band: self.speed_band,
        };
        self.controller.reconcile(&mut ctx);
        for change in &forwarded {
            self.controller.forward_change(change, &mut ctx);
        }

        let report = self.controller.tick(dt, &mut ctx);

        let position = self.controller.simulator().position();
        if let Err(e) = self.params.set(SIMULATOR_POSITION, position) {
            tracing::warn!("Could not publish simulator position: {}", e);
        }
        self.host.on_frame(dt);
        report
    }

    /// Queue a parameter change; it applies at the start of the next tick.
    pub fn request(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.params.request(name, value);
    }

    pub fn start_launch(&mut self) {
        self.params.request(PAUSED, false);
    }

    pub fn stop_launch(&mut self) {
        self.params.request(PAUSED, true);
    }

    pub fn toggle_launch(&mut self) {
        let paused = self.params.flag(PAUSED).unwrap_or(true);
        self.params.request(PAUSED, !paused);
    }

    pub fn params(&self) -> &ParamRegistry {
        &self.params
    }

    pub fn controller(&self) -> &MotionController<L> {
        &self.controller
    }

    pub fn host(&self) -> &dyn HostBindings {
        self.host.as_ref()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Deactivate the active source and close the link. Later calls do nothing.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        tracing::info!("Shutting down launch driver.");

        let mut ctx = SourceContext {
            params: &mut self.params,
            host: self.host.as_mut(),
            speed_band: self.speed_band,
        };
        if let Some(transport) = self.controller.shutdown(&mut ctx) {
            tracing::info!(
                "Closing device link ({} frames sent, {} send errors)",
                transport.stats().frames_sent,
                transport.stats().send_errors
            );
            drop(transport.into_link());
        }
    }
}

impl<L: CommandLink> Drop for LaunchDriver<L> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Period of one frame, with the rate limited to the supported range.
fn frame_period(frame_rate: f32) -> Duration {
    let rate = if frame_rate.is_nan() {
        tracing::warn!("Frame rate is not a number, using {} Hz", MIN_FRAME_RATE);
        MIN_FRAME_RATE
    } else {
        frame_rate.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE)
    };
    Duration::from_secs_f32(1.0 / rate)
}

/// Drive `driver` at `frame_rate` until `shutdown` resolves, then shut it down.
/// Returns the number of frames run.
pub async fn run<L, S>(driver: &mut LaunchDriver<L>, frame_rate: f32, shutdown: S) -> u64
where
    L: CommandLink,
    S: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(frame_period(frame_rate));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut status = IntervalTimer::new(5.0);
    let mut last = Instant::now();
    let mut frames = 0u64;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Frame loop shutting down");
                break;
            }
            _ = interval.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last).as_secs_f32();
                last = now;
                driver.tick(dt);
                frames += 1;
                if status.tick(dt) {
                    tracing::debug!(
                        "Frame {}: source={:?}, simulator={:.1}, paused={}",
                        frames,
                        driver.controller().active_name(),
                        driver.controller().simulator().position(),
                        driver.controller().is_paused()
                    );
                }
            }
        }
    }
    driver.shutdown();
    frames
}
