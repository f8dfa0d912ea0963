//! Wire format of the echo protocol
//!
//! Every probe and every reply is a fixed 14-byte packet in network byte order:
//!
//! ```text
//!  0       1       2               4               6               8                      14
//! +-------+-------+---------------+---------------+---------------+-----------------------+
//! | type  | code  |   checksum    |  identifier   |   sequence    |  timestamp (ms, 48b)  |
//! +-------+-------+---------------+---------------+---------------+-----------------------+
//! ```
//!
//! The checksum is the one's-complement checksum over all seven 16-bit words with the checksum
//! slot itself zeroed. Type and code mirror ICMP's echo request and reply, which is what the
//! responders on the other end expect.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::checksum;
use crate::error::Error;

pub use request::RequestPacket;

mod request;

/// Size of an echo packet in bytes
pub const PACKET_LEN: usize = 14;

/// Type field of an echo request
pub const ECHO_REQUEST: u8 = 8;

/// Type field of an echo reply
pub const ECHO_REPLY: u8 = 0;

/// Code field of both echo request and reply
pub const ECHO_CODE: u8 = 0;

/// Largest value the 48-bit timestamp field can carry
pub const TIMESTAMP_MASK: u64 = 0xFFFF_FFFF_FFFF;

const CHECKSUM_RANGE: std::ops::Range<usize> = 2..4;

/// Lay out an echo packet and fill in its checksum
///
/// Timestamps wider than 48 bits are truncated to their lower 48 bits.
pub fn encode(ty: u8, code: u8, id: u16, sequence: u16, timestamp: u64) -> [u8; PACKET_LEN] {
    let mut buf = [0u8; PACKET_LEN];
    buf[0] = ty;
    buf[1] = code;
    buf[4..6].copy_from_slice(&id.to_be_bytes());
    buf[6..8].copy_from_slice(&sequence.to_be_bytes());
    buf[8..14].copy_from_slice(&(timestamp & TIMESTAMP_MASK).to_be_bytes()[2..]);

    let sum = checksum::compute(&checksum::words(&buf));
    buf[CHECKSUM_RANGE].copy_from_slice(&sum.to_be_bytes());
    buf
}

/// Run the checksum self-check over a received packet
///
/// Only the first 14 bytes are considered. Buffers that are too short never pass.
pub fn is_valid(buf: &[u8]) -> bool {
    buf.len() >= PACKET_LEN && checksum::validate(&checksum::words(&buf[..PACKET_LEN]))
}

/// Milliseconds since the unix epoch, as carried in the timestamp field
pub fn timestamp_now() -> u64 {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    since_epoch.as_millis() as u64 & TIMESTAMP_MASK
}

/// The fields of an echo packet
///
/// A `ProbeMessage` is the parsed form of a packet. Parsing does not look at the checksum; run
/// [`is_valid`] on the raw buffer to find out whether the packet arrived intact.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProbeMessage {
    pub ty: u8,
    pub code: u8,
    pub checksum: u16,
    pub id: u16,
    pub sequence: u16,
    pub timestamp: u64,
}

impl ProbeMessage {
    /// Parse the first 14 bytes of a buffer
    ///
    /// # Errors
    ///
    /// Fails with `MalformedPacket` if the buffer holds fewer than 14 bytes. Trailing bytes are
    /// ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < PACKET_LEN {
            return Err(Error::MalformedPacket {
                len: buf.len(),
                expected: PACKET_LEN,
            });
        }

        let mut stamp = [0u8; 8];
        stamp[2..].copy_from_slice(&buf[8..14]);

        Ok(Self {
            ty: buf[0],
            code: buf[1],
            checksum: u16::from_be_bytes([buf[2], buf[3]]),
            id: u16::from_be_bytes([buf[4], buf[5]]),
            sequence: u16::from_be_bytes([buf[6], buf[7]]),
            timestamp: u64::from_be_bytes(stamp),
        })
    }

    /// Lay this message out on the wire
    ///
    /// The checksum field is recomputed, whatever value it held before.
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        encode(self.ty, self.code, self.id, self.sequence, self.timestamp)
    }

    /// Returns `true` if this is an echo reply
    pub fn is_reply(&self) -> bool {
        self.ty == ECHO_REPLY && self.code == ECHO_CODE
    }

    /// Turn a request into the reply a well-behaved responder would send back
    pub fn into_reply(self) -> Self {
        Self {
            ty: ECHO_REPLY,
            code: ECHO_CODE,
            ..self
        }
    }
}
