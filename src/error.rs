use std::io;
use thiserror::Error;

/// Errors surfaced by a ping session
///
/// Lost or corrupted replies are not errors. They end up as a `ResponseStatus` of the probe they
/// belong to and are tallied as loss. Only problems that keep a session from running at all reach
/// the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// The buffer is too short to hold an echo packet
    #[error("malformed packet: expected at least {expected} bytes, got {len}")]
    MalformedPacket { len: usize, expected: usize },

    /// Opening, writing to or reading from a network endpoint failed
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The run parameters do not describe a valid session
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }
}
