use pnet::packet::Packet;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::thread;
use std::time::{Duration, Instant};

use super::{Config, Dest};
use crate::error::Error;
use crate::packet::RequestPacket;
use crate::receiver::{ProbeOutcome, Receiver};
use crate::summary::{ProbeReport, Summary};
use crate::transport::{Connector, Transport, UdpConnector};

/// Meta information about ping session
#[derive(Debug)]
struct Meta {
    host: String,
    id: u16,
    count: u16,
    period: Duration,
    timeout: Duration,
}

/// Sender context
///
/// The `Sender` owns everything a session needs: the resolved destination, the session identifier
/// and the probe schedule.
#[derive(Debug)]
pub struct Sender {
    meta: Meta,
    addr: SocketAddr,
}

impl Sender {
    /// Create new Sender context from provided configuration
    ///
    /// Host names are resolved to their first address. For IP addresses a reverse lookup is
    /// attempted, but only to have a name to print, so a failing reverse lookup is not an error.
    ///
    /// # Errors
    ///
    /// If the dns lookup of a host name fails, then this function returns a configuration error.
    pub fn new(config: Config) -> Result<Self, Error> {
        // These functions are not used anywhere else in the application
        use dns_lookup::{lookup_addr, lookup_host};

        let (ip, host) = match config.dest {
            Dest::Ip(ip) => {
                let host = match lookup_addr(&ip) {
                    Ok(host) => {
                        info!("Resolved IP {} to host {}", ip, host);
                        host
                    }
                    Err(e) => {
                        debug!("Reverse lookup of {} failed: {}", ip, e);
                        ip.to_string()
                    }
                };
                (ip, host)
            }
            Dest::Host(host) => {
                let ip = lookup_host(&host)
                    .map_err(|e| Error::config(format!("could not resolve {}: {}", host, e)))?
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::config(format!("{} has no address", host)))?;

                info!("Resolved host {} to IP {}", host, ip);

                (ip, host)
            }
        };

        let meta = Meta {
            host,
            id: config.id,
            count: config.count,
            period: config.period,
            timeout: config.timeout,
        };

        Ok(Self {
            meta,
            addr: SocketAddr::new(ip, config.port),
        })
    }

    /// Get the destination IP address for this ping session
    pub fn get_ip_addr(&self) -> IpAddr {
        self.addr.ip()
    }

    /// Get the destination socket address for this ping session
    pub fn get_socket_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Run the ping session over UDP
    pub fn ping(&self) -> Result<Summary, Error> {
        self.ping_with(&UdpConnector)
    }

    /// Send the configured sequence of echo requests
    ///
    /// Probe `n` is launched `period * (n - 1)` after the session starts, whether or not earlier
    /// probes have completed, so probes overlap when the period is shorter than the timeout. Each
    /// probe runs on its own scoped thread with its own endpoint. The session returns once every
    /// probe thread has been joined.
    ///
    /// Returns a summary of the statistics collected during this session.
    ///
    /// # Errors
    ///
    /// If an endpoint cannot be opened when a probe is due, no further probes are launched. The
    /// probes already in flight are still awaited, then the transport error is returned. Failures
    /// of a single probe after its endpoint was opened only cost that probe.
    pub fn ping_with<C: Connector>(&self, connector: &C) -> Result<Summary, Error> {
        println!("PING {} ({})", self.meta.host, self.addr.ip());

        let start = Instant::now();
        let outcomes = self.launch_probes(connector, start)?;
        let end = Instant::now();

        trace!("All {} probes have terminated", outcomes.len());

        let report = ProbeReport::summarize(&outcomes, u64::from(self.meta.count), start, end);
        Ok(Summary::new(self.meta.host.clone(), report))
    }

    /// Spawn the probes on their schedule and collect their outcomes
    fn launch_probes<C: Connector>(
        &self,
        connector: &C,
        start: Instant,
    ) -> Result<Vec<ProbeOutcome>, Error> {
        let scoped = crossbeam::scope(|scope| {
            let mut handles = Vec::with_capacity(usize::from(self.meta.count));
            let mut failure = None;

            for seq in 1..=self.meta.count {
                let launch = match self
                    .meta
                    .period
                    .checked_mul(u32::from(seq - 1))
                    .and_then(|offset| start.checked_add(offset))
                {
                    Some(launch) => launch,
                    None => {
                        error!("Launch time of seq={} does not fit on the clock", seq);
                        failure = Some(io::Error::new(
                            io::ErrorKind::Other,
                            "probe schedule runs past the end of the clock",
                        ));
                        break;
                    }
                };
                let now = Instant::now();
                if launch > now {
                    thread::sleep(launch - now);
                }

                let endpoint = match connector.open(self.addr) {
                    Ok(endpoint) => endpoint,
                    Err(e) => {
                        error!("Could not open endpoint for seq={}: {}", seq, e);
                        warn!("Skipping the remaining {} probes", self.meta.count - seq + 1);

                        failure = Some(e);
                        break;
                    }
                };

                trace!("Launching probe seq={}", seq);

                let receiver = Receiver::new(self.addr, self.meta.id, seq, self.meta.timeout);
                handles.push(scope.spawn(move |_| probe(endpoint, receiver, seq)));
            }

            // Every handle is joined on its own, completion order does not matter
            let mut outcomes = Vec::with_capacity(handles.len());
            for handle in handles {
                match handle.join() {
                    Ok(Some(outcome)) => outcomes.push(outcome),
                    Ok(None) => (),
                    Err(_) => warn!("A probe thread panicked, counting it as lost"),
                }
            }

            (outcomes, failure)
        });

        match scoped {
            Ok((_, Some(e))) => Err(Error::Transport(e)),
            Ok((outcomes, None)) => Ok(outcomes),
            Err(_) => Err(Error::Transport(io::Error::new(
                io::ErrorKind::Other,
                "probe thread panicked",
            ))),
        }
    }
}

/// Send one echo request and wait for its reply
///
/// Returns `None` if the probe could not be sent or its endpoint broke down while waiting. The
/// failure is logged here and the probe counts as lost.
fn probe<T: Transport>(mut endpoint: T, receiver: Receiver, seq: u16) -> Option<ProbeOutcome> {
    let packet = RequestPacket::new(receiver.id(), seq);

    // Stop time and send packet out into the aether
    let departure = Instant::now();
    if let Err(e) = endpoint.send(packet.packet()) {
        error!("Error sending echo request seq={}: {}", seq, e);
        return None;
    }

    match receiver.await_reply(&mut endpoint, departure) {
        Ok(status) => {
            let outcome = ProbeOutcome::new(seq, status);
            outcome.print(&receiver.target());
            Some(outcome)
        }
        Err(e) => {
            error!("Error receiving echo reply seq={}: {}", seq, e);
            None
        }
    }
}
