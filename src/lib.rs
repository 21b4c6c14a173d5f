// src/lib.rs - Launch host library: motion sources, device link and simulator
pub mod communication;
pub mod config;
pub mod host;
pub mod launch;
pub mod motion;
pub mod params;
pub mod scheduler;
pub mod simulator;

pub use communication::{CommandLink, CommandTransport, TransportError, UdpLink};
pub use config::{load_config, Config, ConfigError};
pub use host::{AnimationClock, HeadlessHost, HostBindings, LoopClock};
pub use launch::{run, Bootstrap, LaunchDriver, LaunchError};
pub use motion::{Command, MotionController, MotionSource};
pub use params::{ParamError, ParamRegistry, ParamValue};
pub use simulator::Simulator;
