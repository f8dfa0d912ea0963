//! Command line front end

use clap::{App as ClapApp, ArgMatches};
use std::ffi::OsString;
use std::str::FromStr;

use super::Config;
use crate::error::Error;
use crate::logger::StdLogger;

/// Application initialization
pub struct App;

impl App {
    /// Retrieve user input from command line
    ///
    /// The user can modify the following parameters of the application:
    /// - server_ip: IP address or host name of the responder (default 127.0.0.1)
    /// - server_port: UDP port of the responder (default 8080)
    /// - count: Number of probes to send (default 5)
    /// - period: Interval between probe launches in seconds (default 1.0)
    /// - timeout: Time to wait for each reply in seconds (default 1.0)
    ///
    /// Unknown options make the application exit with a usage message.
    pub fn parse_args() -> Result<Config, Error> {
        let matches = Self::definition().get_matches();
        Self::configure(&matches)
    }

    /// Same as `parse_args`, but from an explicit argument list
    ///
    /// The first item is the program name. Unlike `parse_args` this never exits the process.
    pub fn parse_from<I, T>(args: I) -> Result<Config, Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::definition()
            .get_matches_from_safe(args)
            .map_err(|e| Error::config(e.message))?;
        Self::configure(&matches)
    }

    // Define CLI interface here
    fn definition() -> ClapApp<'static, 'static> {
        clap_app!(udping =>
            (version: crate_version!())
            (about: "Send echo probes to a UDP responder")
            (@arg server_ip: --server_ip +takes_value "IP address or host name of the responder")
            (@arg server_port: --server_port +takes_value "UDP port of the responder")
            (@arg count: --count +takes_value "Number of probes to send")
            (@arg period: --period +takes_value "Interval between probes (in seconds)")
            (@arg timeout: --timeout +takes_value "Time to wait for a reply (in seconds)")
            (@arg verbose: -v ... "Sets the level of verbosity"))
    }

    fn configure(matches: &ArgMatches) -> Result<Config, Error> {
        StdLogger::init(matches.occurrences_of("verbose"));

        let dest = matches.value_of("server_ip").unwrap_or("127.0.0.1");
        let port = value_or(matches, "server_port", 8080u16)?;
        let count = value_or(matches, "count", 5u16)?;
        let period = value_or(matches, "period", 1.0f64)?;
        let timeout = value_or(matches, "timeout", 1.0f64)?;

        let config = Config::new(dest, port, count, period, timeout)?;

        trace!("Parsed configuration.");

        Ok(config)
    }
}

/// Parse an optional argument, falling back to `default` if it was not given
fn value_or<T>(matches: &ArgMatches, name: &str, default: T) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match matches.value_of(name) {
        Some(val) => val
            .parse::<T>()
            .map_err(|e| Error::config(format!("invalid value '{}' for --{}: {}", val, name, e))),
        None => Ok(default),
    }
}
