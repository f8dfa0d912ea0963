//! # UDPING echo probe client
//!
//! This crate provides the components of a small ping client that speaks an ICMP-like echo
//! protocol over plain UDP datagrams. It consists of these components:
//! - The `packet` codec, which lays out and parses the 14-byte echo packets, protected by the
//!   one's-complement `checksum`
//! - The `Sender` context which resolves the destination and launches one probe per period
//! - The `Receiver` which waits for the reply to a single probe and decides its outcome
//! - The `Summary` which reduces all outcomes into loss and round-trip statistics
//!
//! Every probe runs on its own thread with its own socket, so replies cannot be attributed to the
//! wrong probe and a slow reply never holds up the schedule. Each packet is timestamped right
//! before it is passed down to the `Transport` and again right after it has been handed back.

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::process;
use std::time::{Duration, Instant};

use error::Error;

pub mod checksum;
pub mod cli;
pub mod error;
pub mod logger;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod summary;
pub mod transport;

/// Application configuration
///
/// The `Config` will be consumed by the `Sender`. It is validated on construction, so a `Config`
/// always describes a session that can be run.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) dest: Dest,
    pub(crate) port: u16,
    pub(crate) count: u16,
    pub(crate) period: Duration,
    pub(crate) timeout: Duration,
    pub(crate) id: u16,
}

impl Config {
    /// Validate run parameters
    ///
    /// `period` and `timeout` are given in seconds. The session identifier is derived from the
    /// process id, truncated to 16 bits.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `count` is zero, `period` is negative or `timeout` is not
    /// positive, or if the session would run past what `Duration` and `Instant` can represent.
    pub fn new(dest: &str, port: u16, count: u16, period: f64, timeout: f64) -> Result<Self, Error> {
        if count == 0 {
            return Err(Error::config("count must be at least 1"));
        }
        if !period.is_finite() || period < 0.0 {
            return Err(Error::config(format!(
                "period must be a non-negative number of seconds, got {}",
                period
            )));
        }
        if !timeout.is_finite() || timeout <= 0.0 {
            return Err(Error::config(format!(
                "timeout must be a positive number of seconds, got {}",
                timeout
            )));
        }

        let period = Duration::try_from_secs_f64(period)
            .map_err(|e| Error::config(format!("period of {}s is out of range: {}", period, e)))?;
        let timeout = Duration::try_from_secs_f64(timeout)
            .map_err(|e| Error::config(format!("timeout of {}s is out of range: {}", timeout, e)))?;

        // The last probe's deadline has to be representable on the monotonic clock
        let horizon = period
            .checked_mul(u32::from(count - 1))
            .and_then(|schedule| schedule.checked_add(timeout))
            .and_then(|horizon| Instant::now().checked_add(horizon));
        if horizon.is_none() {
            return Err(Error::config(format!(
                "{} probes every {:?} with a timeout of {:?} do not fit on the clock",
                count, period, timeout
            )));
        }

        Ok(Self {
            dest: Dest::parse(dest),
            port,
            count,
            period,
            timeout,
            id: process::id() as u16,
        })
    }

    /// Use a fixed session identifier instead of the process id
    pub fn with_identifier(mut self, id: u16) -> Self {
        self.id = id;
        self
    }

    /// Session identifier carried by every probe
    pub fn identifier(&self) -> u16 {
        self.id
    }
}

/// Destination for ping
///
/// The user can choose to either provide an IP-address or a host name as destination for the ping.
/// The application automatically then handles dns lookup or reverse dns lookup based on the
/// provided argument.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Dest {
    Ip(IpAddr),
    Host(String),
}

impl Dest {
    /// If the input provided is not a valid destination, it will fail during dns resolution
    fn parse(val: &str) -> Self {
        if let Ok(ip) = val.parse::<Ipv4Addr>() {
            return Dest::Ip(IpAddr::V4(ip));
        }
        if let Ok(ip) = val.parse::<Ipv6Addr>() {
            return Dest::Ip(IpAddr::V6(ip));
        }
        Dest::Host(val.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_config() {
        let config = Config::new("10.0.0.1", 9000, 3, 0.25, 1.5).expect("Failed validating config");

        assert_eq!(config.dest, Dest::Ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        assert_eq!(config.port, 9000);
        assert_eq!(config.count, 3);
        assert_eq!(config.period, Duration::from_millis(250));
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.identifier(), process::id() as u16);
        assert_eq!(config.with_identifier(7).identifier(), 7);
    }

    #[test]
    fn zero_period_allowed() {
        let config = Config::new("::1", 1, 1, 0.0, 0.1).unwrap();
        assert_eq!(config.period, Duration::from_secs(0));
        assert_eq!(config.dest, Dest::Ip("::1".parse().unwrap()));
    }

    #[test]
    fn long_but_representable_schedule_accepted() {
        let config = Config::new("127.0.0.1", 1, 65535, 3600.0, 86400.0).unwrap();
        assert_eq!(config.period, Duration::from_secs(3600));
        assert_eq!(config.timeout, Duration::from_secs(86400));
    }

    #[test]
    fn host_names_kept_for_lookup() {
        let config = Config::new("localhost", 1, 1, 1.0, 1.0).unwrap();
        assert_eq!(config.dest, Dest::Host("localhost".to_string()));
    }

    #[test]
    fn invalid_parameters_rejected() {
        let cases = [
            (0u16, 1.0, 1.0),
            (1, -0.5, 1.0),
            (1, std::f64::NAN, 1.0),
            (1, 1.0, 0.0),
            (1, 1.0, -1.0),
            (1, 1.0, std::f64::INFINITY),
            (1, 1e20, 1.0),
            (1, 1.0, 1e20),
            (1, 1e300, 1.0),
            (65535, 1e15, 1.0),
        ];

        for &(count, period, timeout) in cases.iter() {
            match Config::new("127.0.0.1", 8080, count, period, timeout) {
                Err(Error::Configuration(_)) => (),
                other => panic!("accepted {:?}: {:?}", (count, period, timeout), other),
            }
        }
    }
}
