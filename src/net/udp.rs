use std::net::Ipv4Addr;
use tracing::debug;

use super::ip::{check_datagram_size, IpProtocol};
use super::packet::Transport;
use super::pseudo::PseudoHeader;
use crate::error::{PacketError, Result};

pub const UDP_HEADER_LEN: usize = 8;
const CHECKSUM_OFFSET: usize = 6;

/// A UDP datagram: 8-byte header followed by the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpDatagram {
    pub source_port: u16,
    pub destination_port: u16,
    pub payload: Vec<u8>,
}

impl UdpDatagram {
    pub fn new(source_port: u16, destination_port: u16, payload: impl Into<Vec<u8>>) -> Self {
        UdpDatagram {
            source_port,
            destination_port,
            payload: payload.into(),
        }
    }

    pub fn pack_header(&self, checksum: u16) -> Result<[u8; UDP_HEADER_LEN]> {
        let len = self.encoded_len();
        let length = u16::try_from(len)
            .map_err(|_| PacketError::Encoding(format!("UDP length {len} overflows u16")))?;

        let mut header = [0u8; UDP_HEADER_LEN];
        header[0..2].copy_from_slice(&self.source_port.to_be_bytes());
        header[2..4].copy_from_slice(&self.destination_port.to_be_bytes());
        header[4..6].copy_from_slice(&length.to_be_bytes());
        header[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_be_bytes());
        Ok(header)
    }
}

impl Transport for UdpDatagram {
    fn protocol(&self) -> IpProtocol {
        IpProtocol::Udp
    }

    fn encoded_len(&self) -> usize {
        UDP_HEADER_LEN + self.payload.len()
    }

    /// Header followed by payload. A computed checksum of zero goes out as
    /// 0xffff, since zero on the wire means "no checksum" (RFC 768).
    fn encode(&self, source: &Ipv4Addr, destination: &Ipv4Addr) -> Result<Vec<u8>> {
        let datagram_len = self.encoded_len();
        check_datagram_size(datagram_len)?;
        let pseudo = PseudoHeader::new(*source, *destination, IpProtocol::Udp, datagram_len)?;

        let mut datagram = Vec::with_capacity(datagram_len);
        datagram.extend_from_slice(&self.pack_header(0)?);
        datagram.extend_from_slice(&self.payload);

        let checksum = match pseudo.checksum(&datagram)? {
            0 => 0xffff,
            checksum => checksum,
        };
        datagram[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_be_bytes());
        debug!(
            source_port = self.source_port,
            destination_port = self.destination_port,
            len = datagram_len,
            "UDP checksum 0x{checksum:04x}"
        );

        Ok(datagram)
    }
}
