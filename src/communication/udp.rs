// src/communication/udp.rs - Non-blocking UDP socket pair to the device bridge
use std::io;
use std::net::{SocketAddr, UdpSocket};

use crate::communication::{CommandLink, TransportError};
use crate::config::NetworkConfig;

// Largest datagram we expect back from the bridge.
const RECV_BUFFER: usize = 2048;

/// Send socket plus listen socket. Both are non-blocking so a slow or absent
/// peer never stalls the frame loop.
pub struct UdpLink {
    send_socket: UdpSocket,
    listen_socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpLink {
    pub fn bind(config: &NetworkConfig) -> Result<Self, TransportError> {
        let listen_addr = SocketAddr::new(config.bind_ip, config.listen_port);
        let peer = SocketAddr::new(config.peer_ip, config.send_port);

        let listen_socket =
            UdpSocket::bind(listen_addr).map_err(|e| TransportError::Bind(listen_addr, e))?;
        let send_addr = SocketAddr::new(config.bind_ip, 0);
        let send_socket =
            UdpSocket::bind(send_addr).map_err(|e| TransportError::Bind(send_addr, e))?;
        listen_socket.set_nonblocking(true)?;
        send_socket.set_nonblocking(true)?;

        tracing::info!(
            "UDP link ready: sending to {}, listening on {}",
            peer,
            listen_socket.local_addr()?
        );
        Ok(Self {
            send_socket,
            listen_socket,
            peer,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn listen_addr(&self) -> io::Result<SocketAddr> {
        self.listen_socket.local_addr()
    }

    pub fn send_addr(&self) -> io::Result<SocketAddr> {
        self.send_socket.local_addr()
    }
}

impl CommandLink for UdpLink {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        match self.send_socket.send_to(frame, self.peer) {
            Ok(n) if n == frame.len() => Ok(()),
            Ok(n) => Err(TransportError::Partial { sent: n, len: frame.len() }),
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn recv_latest(&mut self) -> Result<(Option<Vec<u8>>, u64), TransportError> {
        let mut buf = [0u8; RECV_BUFFER];
        let mut latest = None;
        let mut dropped = 0u64;
        loop {
            match self.listen_socket.recv_from(&mut buf) {
                Ok((n, _src)) => {
                    if latest.is_some() {
                        dropped += 1;
                    }
                    latest = Some(buf[..n].to_vec());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                // Windows reports an unreachable peer on the next receive; nothing to read.
                Err(e) if e.kind() == io::ErrorKind::ConnectionReset => break,
                Err(e) => return Err(TransportError::Io(e)),
            }
        }
        Ok((latest, dropped))
    }
}

impl std::fmt::Debug for UdpLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpLink")
            .field("peer", &self.peer)
            .field("listen", &self.listen_socket.local_addr().ok())
            .finish()
    }
}
