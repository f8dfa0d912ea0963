//! Datagram transport underneath a probe
//!
//! The session only relies on being able to send a buffer to its destination and to wait a bounded
//! amount of time for a datagram to come back. `Connector` hands out one fresh `Transport` per
//! probe, so concurrent probes never share socket state and a late reply can never be picked up by
//! the wrong probe.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

/// Largest datagram accepted from the network
///
/// Replies are only 14 bytes long, anything past the buffer is discarded by the OS.
const RECV_BUFFER: usize = 1024;

/// Send and receive half of a single probe's endpoint
pub trait Transport {
    /// Send a datagram to the endpoint's destination
    fn send(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Wait at most `max_wait` for the next datagram
    ///
    /// Returns `None` if nothing arrived in time, otherwise the datagram and the address it came
    /// from. Windows reports an earlier ICMP port unreachable as a `ConnectionReset` error on the
    /// next receive; it is up to the caller to keep waiting.
    fn receive(&mut self, max_wait: Duration) -> io::Result<Option<(Vec<u8>, SocketAddr)>>;
}

/// Factory for per-probe endpoints
pub trait Connector: Sync {
    type Endpoint: Transport + Send + 'static;

    /// Open a new endpoint talking to `target`
    fn open(&self, target: SocketAddr) -> io::Result<Self::Endpoint>;
}

/// Opens a UDP socket on an ephemeral port for every probe
#[derive(Debug, Default, Copy, Clone)]
pub struct UdpConnector;

impl Connector for UdpConnector {
    type Endpoint = UdpEndpoint;

    /// Bind an unconnected socket of the target's address family
    ///
    /// The socket stays unconnected. A connected socket would turn an ICMP port
    /// unreachable into a receive error instead of letting the probe run into its timeout.
    fn open(&self, target: SocketAddr) -> io::Result<UdpEndpoint> {
        let local = match target {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };

        let socket = UdpSocket::bind(local)?;
        trace!("Bound probe socket to {}", socket.local_addr()?);

        Ok(UdpEndpoint { socket, target })
    }
}

/// A UDP socket dedicated to one probe
#[derive(Debug)]
pub struct UdpEndpoint {
    socket: UdpSocket,
    target: SocketAddr,
}

impl Transport for UdpEndpoint {
    fn send(&mut self, buf: &[u8]) -> io::Result<()> {
        let sent = self.socket.send_to(buf, self.target)?;
        if sent != buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sent {} of {} bytes", sent, buf.len()),
            ));
        }
        Ok(())
    }

    fn receive(&mut self, max_wait: Duration) -> io::Result<Option<(Vec<u8>, SocketAddr)>> {
        // A zero read timeout would block forever
        if max_wait == Duration::from_secs(0) {
            return Ok(None);
        }
        self.socket.set_read_timeout(Some(max_wait))?;

        let mut buf = [0u8; RECV_BUFFER];
        match self.socket.recv_from(&mut buf) {
            Ok((len, from)) => Ok(Some((buf[..len].to_vec(), from))),
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
