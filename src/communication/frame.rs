//! Six byte command frame: `[position:u8][speed:u8][duration:f32 LE]`.
//!
//! No header, length prefix or checksum; one frame per datagram. The duration
//! is sent little-endian, which is what the device bridge expects.

use thiserror::Error;

use crate::motion::prediction::predict_move_duration;
use crate::motion::source::Command;

pub const FRAME_LEN: usize = 6;

#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("Frame must be 6 bytes, got {0}")]
    Length(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub position: u8,
    pub speed: u8,
    /// Predicted move time in seconds.
    pub duration: f32,
}

impl Frame {
    /// Frame for `command`, timing the move from `last_sent_position`.
    pub fn for_command(command: Command, last_sent_position: u8) -> Self {
        let distance = (command.position as f32 - last_sent_position as f32).abs();
        Self {
            position: command.position,
            speed: command.speed,
            duration: predict_move_duration(distance, command.speed as f32),
        }
    }

    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        buf[0] = self.position;
        buf[1] = self.speed;
        buf[2..].copy_from_slice(&self.duration.to_le_bytes());
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() != FRAME_LEN {
            return Err(FrameError::Length(data.len()));
        }
        Ok(Self {
            position: data[0],
            speed: data[1],
            duration: f32::from_le_bytes([data[2], data[3], data[4], data[5]]),
        })
    }
}
