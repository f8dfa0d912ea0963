use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::packet::{self, ProbeMessage};
use crate::transport::Transport;

/// Terminal status of an echo probe
///
/// Every probe starts out pending and ends in exactly one of these states. A probe is never
/// retried, a lost reply is recorded once and the session moves on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResponseStatus {
    /// A valid reply arrived after the given round-trip time
    Received(Duration),

    /// A reply arrived, but it was corrupted or truncated
    ChecksumFailure,

    /// No reply arrived before the timeout elapsed
    TimedOut,
}

/// Result of a single probe
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub sequence: u16,
    pub status: ResponseStatus,
}

impl ProbeOutcome {
    pub fn new(sequence: u16, status: ResponseStatus) -> Self {
        Self { sequence, status }
    }

    /// Round-trip time, if the probe was answered
    pub fn rtt(&self) -> Option<Duration> {
        match self.status {
            ResponseStatus::Received(rtt) => Some(rtt),
            _ => None,
        }
    }

    /// Print the per-probe line for this outcome
    pub fn print(&self, addr: &SocketAddr) {
        match self.status {
            ResponseStatus::Received(rtt) => println!(
                "PONG {}: seq={} time={} ms",
                addr.ip(),
                self.sequence,
                rtt.as_millis()
            ),
            ResponseStatus::ChecksumFailure => println!(
                "Error (invalid checksum) receiving PONG {}: seq={}",
                addr.ip(),
                self.sequence
            ),
            ResponseStatus::TimedOut => println!(
                "Error (timeout) receiving PONG {}: seq={}",
                addr.ip(),
                self.sequence
            ),
        }
    }
}

/// Waits for the reply to one outstanding probe
///
/// The `Receiver` knows which identifier and sequence number the reply has to carry, where it has
/// to come from and how long it may take.
#[derive(Debug)]
pub struct Receiver {
    target: SocketAddr,
    id: u16,
    sequence: u16,
    timeout: Duration,
}

impl Receiver {
    pub fn new(target: SocketAddr, id: u16, sequence: u16, timeout: Duration) -> Self {
        Self {
            target,
            id,
            sequence,
            timeout,
        }
    }

    /// Identifier the reply has to carry
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Address the reply has to come from
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Block until the probe sent at `departure` reaches a terminal state
    ///
    /// Datagrams from other sources, and intact packets carrying a different identifier or
    /// sequence number, are strays. They are dropped and the wait goes on until the deadline.
    /// Anything from the target that is truncated or fails the checksum ends the probe as a
    /// checksum failure.
    ///
    /// A connection reset, which some platforms report for an earlier ICMP port unreachable, does
    /// not end the wait either.
    ///
    /// # Errors
    ///
    /// Other errors reading from the transport are passed on to the caller.
    pub fn await_reply<T: Transport>(
        &self,
        endpoint: &mut T,
        departure: Instant,
    ) -> io::Result<ResponseStatus> {
        // Past the end of the clock the deadline is never reached
        let deadline = departure.checked_add(self.timeout);

        loop {
            let max_wait = match deadline {
                Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                    Some(left) if left > Duration::from_secs(0) => left,
                    _ => return Ok(ResponseStatus::TimedOut),
                },
                None => self.timeout,
            };

            let (datagram, from) = match endpoint.receive(max_wait) {
                Ok(Some(received)) => received,
                Ok(None) => return Ok(ResponseStatus::TimedOut),
                Err(ref e) if e.kind() == io::ErrorKind::ConnectionReset => {
                    debug!("seq={}: connection reset while waiting, still listening", self.sequence);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let arrival = Instant::now();

            if from != self.target {
                debug!("Dropping datagram from unexpected source {}", from);
                continue;
            }

            let reply = match ProbeMessage::decode(&datagram) {
                Ok(reply) => reply,
                Err(e) => {
                    debug!("seq={}: {}", self.sequence, e);
                    return Ok(ResponseStatus::ChecksumFailure);
                }
            };

            if !packet::is_valid(&datagram) {
                debug!(
                    "seq={}: checksum {:#06x} does not add up",
                    self.sequence, reply.checksum
                );
                return Ok(ResponseStatus::ChecksumFailure);
            }

            if reply.id != self.id || reply.sequence != self.sequence {
                debug!(
                    "seq={}: dropping stray reply id={} seq={}",
                    self.sequence, reply.id, reply.sequence
                );
                continue;
            }

            if !reply.is_reply() {
                trace!(
                    "seq={}: reply carries type {} code {}",
                    self.sequence,
                    reply.ty,
                    reply.code
                );
            }

            return Ok(ResponseStatus::Received(arrival.duration_since(departure)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{encode, ECHO_CODE, ECHO_REPLY};
    use std::collections::VecDeque;

    /// Transport that plays back a fixed list of datagrams, then times out
    ///
    /// Before the first datagram it fails `resets` times with a connection reset.
    struct Script {
        incoming: VecDeque<(Vec<u8>, SocketAddr)>,
        resets: usize,
    }

    impl Script {
        fn new(incoming: Vec<(Vec<u8>, SocketAddr)>) -> Self {
            Self {
                incoming: incoming.into(),
                resets: 0,
            }
        }
    }

    impl Transport for Script {
        fn send(&mut self, _buf: &[u8]) -> io::Result<()> {
            Ok(())
        }

        fn receive(&mut self, _max_wait: Duration) -> io::Result<Option<(Vec<u8>, SocketAddr)>> {
            if self.resets > 0 {
                self.resets -= 1;
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "port unreachable"));
            }
            Ok(self.incoming.pop_front())
        }
    }

    fn target() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn receiver() -> Receiver {
        Receiver::new(target(), 42, 3, Duration::from_secs(1))
    }

    fn reply(id: u16, seq: u16) -> Vec<u8> {
        encode(ECHO_REPLY, ECHO_CODE, id, seq, 1234).to_vec()
    }

    #[test]
    fn valid_reply_is_received() {
        let mut script = Script::new(vec![(reply(42, 3), target())]);
        let status = receiver().await_reply(&mut script, Instant::now()).unwrap();

        match status {
            ResponseStatus::Received(rtt) => assert!(rtt < Duration::from_secs(1)),
            other => panic!("Expected a reply, got {:?}", other),
        }
    }

    #[test]
    fn silence_times_out() {
        let mut script = Script::new(vec![]);
        let status = receiver().await_reply(&mut script, Instant::now()).unwrap();
        assert_eq!(status, ResponseStatus::TimedOut);
    }

    #[test]
    fn expired_deadline_times_out() {
        let mut script = Script::new(vec![(reply(42, 3), target())]);
        let departure = Instant::now() - Duration::from_secs(2);
        let status = receiver().await_reply(&mut script, departure).unwrap();
        assert_eq!(status, ResponseStatus::TimedOut);
    }

    #[test]
    fn corrupted_reply_fails_checksum() {
        let mut corrupted = reply(42, 3);
        corrupted[10] ^= 0x01;

        let mut script = Script::new(vec![(corrupted, target())]);
        let status = receiver().await_reply(&mut script, Instant::now()).unwrap();
        assert_eq!(status, ResponseStatus::ChecksumFailure);
    }

    #[test]
    fn truncated_reply_fails_checksum() {
        let mut script = Script::new(vec![(reply(42, 3)[..9].to_vec(), target())]);
        let status = receiver().await_reply(&mut script, Instant::now()).unwrap();
        assert_eq!(status, ResponseStatus::ChecksumFailure);
    }

    #[test]
    fn strays_are_skipped() {
        let elsewhere: SocketAddr = "127.0.0.2:8080".parse().unwrap();
        let mut script = Script::new(vec![
            (reply(42, 3), elsewhere),
            (reply(7, 3), target()),
            (reply(42, 2), target()),
            (reply(42, 3), target()),
        ]);

        let status = receiver().await_reply(&mut script, Instant::now()).unwrap();
        assert!(matches!(status, ResponseStatus::Received(_)));
        assert!(script.incoming.is_empty());
    }

    #[test]
    fn only_strays_time_out() {
        let mut script = Script::new(vec![(reply(7, 3), target())]);
        let status = receiver().await_reply(&mut script, Instant::now()).unwrap();
        assert_eq!(status, ResponseStatus::TimedOut);
    }

    #[test]
    fn connection_reset_keeps_waiting() {
        let mut script = Script::new(vec![(reply(42, 3), target())]);
        script.resets = 2;

        let status = receiver().await_reply(&mut script, Instant::now()).unwrap();
        assert!(matches!(status, ResponseStatus::Received(_)));
        assert_eq!(script.resets, 0);
    }

    #[test]
    fn other_transport_errors_propagate() {
        struct Broken;

        impl Transport for Broken {
            fn send(&mut self, _buf: &[u8]) -> io::Result<()> {
                Ok(())
            }

            fn receive(&mut self, _: Duration) -> io::Result<Option<(Vec<u8>, SocketAddr)>> {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            }
        }

        let err = receiver().await_reply(&mut Broken, Instant::now()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn timeout_past_end_of_clock_does_not_panic() {
        let receiver = Receiver::new(target(), 42, 3, Duration::from_secs(u64::MAX));
        let mut script = Script::new(vec![(reply(42, 3), target())]);

        let status = receiver.await_reply(&mut script, Instant::now()).unwrap();
        assert!(matches!(status, ResponseStatus::Received(_)));
    }

    #[test]
    fn outcome_rtt() {
        let rtt = Duration::from_millis(12);
        assert_eq!(
            ProbeOutcome::new(1, ResponseStatus::Received(rtt)).rtt(),
            Some(rtt)
        );
        assert_eq!(ProbeOutcome::new(2, ResponseStatus::TimedOut).rtt(), None);
        assert_eq!(
            ProbeOutcome::new(3, ResponseStatus::ChecksumFailure).rtt(),
            None
        );
    }
}
