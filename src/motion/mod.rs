// src/motion/mod.rs - Motion sources, prediction model and the controller
pub mod controller;
pub mod oscillate;
pub mod pattern;
pub mod prediction;
pub mod source;
pub mod zone;

pub use controller::{MotionController, TickReport};
pub use oscillate::{Direction, OscillateSource};
pub use pattern::PatternSource;
pub use prediction::{
    predict_distance_traveled, predict_move_duration, predict_move_speed, predict_move_speed_in,
    SpeedBand,
};
pub use source::{Command, MotionSource, SourceContext};
pub use zone::ZoneSource;
