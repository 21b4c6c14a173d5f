//! # Launch Host Configuration
//!
//! All settings live in a single TOML file. Every section is optional and
//! falls back to the defaults shown here.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [network]
//! peer_ip = "127.0.0.1"
//! send_port = 15601
//! listen_port = 15600
//! poll_interval = 0.033
//!
//! [limits]
//! position_max = 99
//! speed_min = 10.0
//! speed_max = 90.0
//!
//! [motion]
//! source = "Oscillate"
//! paused = true
//!
//! [params]
//! osc_speed = 45.0
//!
//! [[animation]]
//! name = "hips"
//! total_time = 2.0
//! ```
//!
//! - `[params]` holds saved parameter values restored when the motion sources declare them.
//! - `[[animation]]` entries become animation clocks of the headless host.

// src/config.rs - Single configuration file
use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::motion::prediction::{SpeedBand, POSITION_MAX, SPEED_MAX, SPEED_MIN};
use crate::params::ParamValue;

pub const MIN_FRAME_RATE: f32 = 1.0;
pub const MAX_FRAME_RATE: f32 = 1000.0;
pub const MAX_POLL_INTERVAL: f32 = 60.0;
pub const MAX_DIRECTION_CHANGE_DELAY: f32 = 10.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct for the transport, limits, motion and saved parameters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    #[serde(default)]
    pub animation: Vec<AnimationConfig>,
}

/// Datagram link to the device bridge.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    #[serde(default = "default_ip")]
    pub peer_ip: IpAddr,
    #[serde(default = "default_ip")]
    pub bind_ip: IpAddr,
    /// Peer port frames are sent to.
    #[serde(default = "default_send_port")]
    pub send_port: u16,
    /// Local port inbound datagrams arrive on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Seconds between inbound polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: f32,
    /// Fail startup when the sockets cannot be bound instead of running simulation-only.
    #[serde(default)]
    pub required: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            peer_ip: default_ip(),
            bind_ip: default_ip(),
            send_port: default_send_port(),
            listen_port: default_listen_port(),
            poll_interval: default_poll_interval(),
            required: false,
        }
    }
}

/// Device bounds. Position range and speed band are independent.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    #[serde(default = "default_position_max")]
    pub position_max: u8,
    #[serde(default = "default_speed_min")]
    pub speed_min: f32,
    #[serde(default = "default_speed_max")]
    pub speed_max: f32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            position_max: default_position_max(),
            speed_min: default_speed_min(),
            speed_max: default_speed_max(),
        }
    }
}

impl LimitsConfig {
    pub fn speed_band(&self) -> SpeedBand {
        SpeedBand::new(self.speed_min, self.speed_max)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MotionConfig {
    /// Name of the motion source active at start.
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_paused")]
    pub paused: bool,
    /// Pause inserted at every oscillation reversal, in seconds.
    #[serde(default = "default_direction_change_delay")]
    pub direction_change_delay: f32,
    /// Frames per second of the headless frame loop.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            paused: default_paused(),
            direction_change_delay: default_direction_change_delay(),
            frame_rate: default_frame_rate(),
        }
    }
}

/// Animation clock exposed by the headless host.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnimationConfig {
    pub name: String,
    pub total_time: f32,
}

impl Config {
    /// Validate cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let net = &self.network;
        if net.send_port == net.listen_port && net.send_port != 0 && net.peer_ip == net.bind_ip {
            return Err(ConfigError::Invalid(format!(
                "send_port and listen_port must differ (both {})",
                net.send_port
            )));
        }
        if !(net.poll_interval > 0.0 && net.poll_interval <= MAX_POLL_INTERVAL) {
            return Err(ConfigError::Invalid(format!(
                "network.poll_interval must be in (0, {}] seconds",
                MAX_POLL_INTERVAL
            )));
        }
        let limits = &self.limits;
        if limits.position_max == 0 {
            return Err(ConfigError::Invalid("limits.position_max must be > 0".to_string()));
        }
        // f32::clamp panics on NaN bounds.
        let band_ok = limits.speed_min > 0.0
            && limits.speed_min < limits.speed_max
            && limits.speed_max.is_finite();
        if !band_ok {
            return Err(ConfigError::Invalid(
                "limits.speed_min must be > 0 and below limits.speed_max".to_string(),
            ));
        }
        let motion = &self.motion;
        if !(MIN_FRAME_RATE..=MAX_FRAME_RATE).contains(&motion.frame_rate) {
            return Err(ConfigError::Invalid(format!(
                "motion.frame_rate must be in [{}, {}] Hz",
                MIN_FRAME_RATE, MAX_FRAME_RATE
            )));
        }
        if !(0.0..=MAX_DIRECTION_CHANGE_DELAY).contains(&motion.direction_change_delay) {
            return Err(ConfigError::Invalid(format!(
                "motion.direction_change_delay must be in [0, {}] seconds",
                MAX_DIRECTION_CHANGE_DELAY
            )));
        }
        for animation in &self.animation {
            if !(animation.total_time > 0.0 && animation.total_time.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "animation '{}' must have a positive total_time",
                    animation.name
                )));
            }
        }
        Ok(())
    }
}

// Default value functions
fn default_ip() -> IpAddr { IpAddr::from([127, 0, 0, 1]) }
fn default_send_port() -> u16 { 15601 }
fn default_listen_port() -> u16 { 15600 }
fn default_poll_interval() -> f32 { 0.033 }
fn default_position_max() -> u8 { POSITION_MAX as u8 }
fn default_speed_min() -> f32 { SPEED_MIN }
fn default_speed_max() -> f32 { SPEED_MAX }
fn default_source() -> String { "Oscillate".to_string() }
fn default_paused() -> bool { true }
fn default_direction_change_delay() -> f32 { 0.02 }
fn default_frame_rate() -> f32 { 60.0 }

/// Load and validate configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let config: Config = match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                return Err(ConfigError::Toml(e));
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            return Err(ConfigError::Io(e));
        }
    };
    config.validate()?;
    Ok(config)
}
