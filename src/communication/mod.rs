//! Command dispatch to the device bridge.

pub mod frame;
pub mod udp;

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::communication::frame::Frame;
use crate::motion::source::Command;
use crate::scheduler::IntervalTimer;

pub use frame::{FrameError, FRAME_LEN};
pub use udp::UdpLink;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to bind {0}: {1}")]
    Bind(SocketAddr, #[source] io::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Partial send: {sent} of {len} bytes")]
    Partial { sent: usize, len: usize },
    #[error("Transport is closed")]
    Closed,
}

/// Best-effort datagram link. Implementations must never block.
pub trait CommandLink {
    /// Send one datagram.
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Drain buffered datagrams. Returns the newest one, if any, and how many
    /// older ones were discarded.
    fn recv_latest(&mut self) -> Result<(Option<Vec<u8>>, u64), TransportError>;
}

/// Transport statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportStats {
    pub frames_sent: u64,
    pub send_errors: u64,
    pub datagrams_received: u64,
    pub datagrams_dropped: u64,
    pub receive_errors: u64,
}

/// Encodes commands into frames over a [`CommandLink`] and polls it for
/// inbound datagrams at a bounded rate.
pub struct CommandTransport<L: CommandLink> {
    link: L,
    poll: IntervalTimer,
    stats: TransportStats,
}

impl<L: CommandLink> CommandTransport<L> {
    pub fn new(link: L, poll_interval: f32) -> Self {
        Self {
            link,
            poll: IntervalTimer::new(poll_interval),
            stats: TransportStats::default(),
        }
    }

    /// Encode and transmit `command`, timing the move from `last_sent_position`.
    /// No acknowledgement and no retry.
    pub fn send(
        &mut self,
        command: Command,
        last_sent_position: u8,
    ) -> Result<Frame, TransportError> {
        let frame = Frame::for_command(command, last_sent_position);
        match self.link.send(&frame.encode()) {
            Ok(()) => {
                self.stats.frames_sent += 1;
                tracing::debug!(
                    "Sent frame: P:{}, S:{}, D:{:.3}",
                    frame.position,
                    frame.speed,
                    frame.duration
                );
                Ok(frame)
            }
            Err(e) => {
                self.stats.send_errors += 1;
                Err(e)
            }
        }
    }

    /// Poll for inbound datagrams when the poll interval elapsed. Returns the
    /// newest datagram; older ones buffered since the last poll are dropped.
    pub fn poll_inbound(&mut self, dt: f32) -> Option<Vec<u8>> {
        if !self.poll.tick(dt) {
            return None;
        }
        match self.link.recv_latest() {
            Ok((latest, dropped)) => {
                self.stats.datagrams_dropped += dropped;
                if let Some(data) = &latest {
                    self.stats.datagrams_received += 1 + dropped;
                    tracing::trace!("Inbound datagram ({} bytes, {} dropped)", data.len(), dropped);
                }
                latest
            }
            Err(e) => {
                self.stats.receive_errors += 1;
                tracing::warn!("Inbound poll failed: {}", e);
                None
            }
        }
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Give back the link, closing the transport.
    pub fn into_link(self) -> L {
        self.link
    }
}

impl<L: CommandLink> std::fmt::Debug for CommandTransport<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTransport")
            .field("poll_interval", &self.poll.period())
            .field("stats", &self.stats)
            .finish()
    }
}
