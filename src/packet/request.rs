use pnet::packet::Packet;

use super::{encode, timestamp_now, ECHO_CODE, ECHO_REQUEST, PACKET_LEN};

/// Offset of the timestamp, which is all the payload an echo packet has
const HEADER_LEN: usize = 8;

/// A ping packet before send-out
///
/// Low-level abstraction for an outgoing echo request. The packet is stamped with the wall clock
/// and checksummed when it is created, so it should be created right before it is handed to the
/// transport.
#[derive(Debug, Copy, Clone)]
pub struct RequestPacket {
    buf: [u8; PACKET_LEN],
}

impl RequestPacket {
    /// Create a new echo request stamped with the current time
    ///
    /// The identifier is shared by all packets of a session. The sequence number tells the probes
    /// of one session apart.
    pub fn new(id: u16, sequence: u16) -> Self {
        Self::with_timestamp(id, sequence, timestamp_now())
    }

    /// Create a new echo request with an explicit timestamp
    pub fn with_timestamp(id: u16, sequence: u16, timestamp: u64) -> Self {
        Self {
            buf: encode(ECHO_REQUEST, ECHO_CODE, id, sequence, timestamp),
        }
    }
}

impl Packet for RequestPacket {
    fn packet(&self) -> &[u8] {
        &self.buf
    }

    fn payload(&self) -> &[u8] {
        &self.buf[HEADER_LEN..]
    }
}
