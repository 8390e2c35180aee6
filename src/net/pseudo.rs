use std::net::Ipv4Addr;

use super::checksum::Checksum;
use super::ip::IpProtocol;
use crate::error::{PacketError, Result};

pub const PSEUDO_HEADER_LEN: usize = 12;

/// The IPv4 pseudo-header that TCP and UDP checksums cover (RFC 793, RFC 768).
/// Only ever summed, never transmitted:
///
/// ```text
///  0      7 8     15 16    23 24    31
/// +--------+--------+--------+--------+
/// |          source address           |
/// +--------+--------+--------+--------+
/// |        destination address        |
/// +--------+--------+--------+--------+
/// |  zero  |protocol|  segment length |
/// +--------+--------+--------+--------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PseudoHeader {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub protocol: IpProtocol,
    pub length: u16,
}

impl PseudoHeader {
    pub fn new(
        source: Ipv4Addr,
        destination: Ipv4Addr,
        protocol: IpProtocol,
        segment_len: usize,
    ) -> Result<Self> {
        let length = u16::try_from(segment_len).map_err(|_| {
            PacketError::Encoding(format!("segment length {segment_len} does not fit the pseudo-header"))
        })?;
        Ok(PseudoHeader {
            source,
            destination,
            protocol,
            length,
        })
    }

    pub fn to_bytes(&self) -> [u8; PSEUDO_HEADER_LEN] {
        let mut buffer = [0u8; PSEUDO_HEADER_LEN];
        buffer[0..4].copy_from_slice(&self.source.octets());
        buffer[4..8].copy_from_slice(&self.destination.octets());
        buffer[8] = 0;
        buffer[9] = self.protocol.number();
        buffer[10..12].copy_from_slice(&self.length.to_be_bytes());
        buffer
    }

    /// Checksum over this pseudo-header followed by `segment`. The
    /// segment's own checksum field must already be zero.
    pub fn checksum(&self, segment: &[u8]) -> Result<u16> {
        if usize::from(self.length) != segment.len() {
            return Err(PacketError::Encoding(format!(
                "pseudo-header length {} does not match a {} byte segment",
                self.length,
                segment.len()
            )));
        }

        Ok(Checksum::new().add_bytes(&self.to_bytes()).add_bytes(segment).finish())
    }
}
