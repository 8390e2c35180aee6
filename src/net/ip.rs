use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet_packet::ipv4::Ipv4Packet;
use std::net::Ipv4Addr;

use super::checksum::rfc1071_checksum;
use crate::error::{PacketError, Result};

/// Length of an IPv4 header without options
pub const IPV4_HEADER_LEN: usize = 20;
/// Largest datagram the 16-bit total length field can describe (IP_MAXPACKET)
pub const IPV4_MAX_DATAGRAM: usize = 65535;
pub const DEFAULT_TTL: u8 = 255;

/// Transport protocols this crate knows how to encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    Tcp,
    Udp,
}

impl IpProtocol {
    pub fn number(self) -> u8 {
        self.next_header().0
    }

    pub fn next_header(self) -> IpNextHeaderProtocol {
        match self {
            IpProtocol::Tcp => IpNextHeaderProtocols::Tcp,
            IpProtocol::Udp => IpNextHeaderProtocols::Udp,
        }
    }
}

/// Who fills in the total length and header checksum fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderFill {
    /// Computed here, so the buffer is valid on any path
    #[default]
    Computed,
    /// Left zero for the kernel, as Linux does on IPPROTO_RAW sockets
    Kernel,
}

/// Rejects datagrams whose total length would not fit the IPv4 header.
/// Returns the total datagram length on success.
pub fn check_datagram_size(transport_len: usize) -> Result<usize> {
    let size = IPV4_HEADER_LEN.saturating_add(transport_len);
    if size > IPV4_MAX_DATAGRAM {
        return Err(PacketError::Size {
            size,
            max: IPV4_MAX_DATAGRAM,
        });
    }
    Ok(size)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    // version: 4 bits
    pub version: u8,
    // Internet header length in 32-bit words: 4 bits
    pub ihl: u8,
    // Type of service: 8 bits
    pub tos: u8,
    // Total length: 16 bits
    pub total_length: u16,
    // Identification: 16 bits
    pub identification: u16,
    // Flags (reserved, DF, MF): 3 bits
    pub flags: u8,
    // Fragment offset: 13 bits
    pub frag_offset: u16,
    // Time to live: 8 bits
    pub ttl: u8,
    // Protocol: 8 bits
    pub proto: u8,
    // Header checksum: 16 bits
    pub checksum: u16,
    pub source_address: Ipv4Addr,
    pub destination_address: Ipv4Addr,
}

impl Ipv4Header {
    /// A header for an unfragmented datagram with no options.
    pub fn new(source: Ipv4Addr, destination: Ipv4Addr, protocol: IpProtocol) -> Self {
        Ipv4Header {
            version: 4,
            ihl: (IPV4_HEADER_LEN / 4) as u8,
            tos: 0,
            total_length: 0,
            identification: 0,
            flags: 0,
            frag_offset: 0,
            ttl: DEFAULT_TTL,
            proto: protocol.number(),
            checksum: 0,
            source_address: source,
            destination_address: destination,
        }
    }

    /// Serialises the fields exactly as they are set.
    pub fn to_bytes(&self) -> [u8; IPV4_HEADER_LEN] {
        let mut buffer = [0u8; IPV4_HEADER_LEN];

        buffer[0] = (self.version << 4) | (self.ihl & 0x0f);
        buffer[1] = self.tos;
        buffer[2..4].copy_from_slice(&self.total_length.to_be_bytes());
        buffer[4..6].copy_from_slice(&self.identification.to_be_bytes());
        let flags_and_offset = (u16::from(self.flags & 0x07) << 13) | (self.frag_offset & 0x1fff);
        buffer[6..8].copy_from_slice(&flags_and_offset.to_be_bytes());
        buffer[8] = self.ttl;
        buffer[9] = self.proto;
        buffer[10..12].copy_from_slice(&self.checksum.to_be_bytes());
        buffer[12..16].copy_from_slice(&self.source_address.octets());
        buffer[16..20].copy_from_slice(&self.destination_address.octets());

        buffer
    }

    /// Sets total length and checksum for a datagram carrying
    /// `transport_len` bytes after the header, then serialises it.
    pub fn pack(&mut self, transport_len: usize, fill: HeaderFill) -> Result<[u8; IPV4_HEADER_LEN]> {
        let total = check_datagram_size(transport_len)?;

        self.checksum = 0;
        match fill {
            HeaderFill::Kernel => {
                self.total_length = 0;
                Ok(self.to_bytes())
            }
            HeaderFill::Computed => {
                self.total_length = u16::try_from(total)
                    .map_err(|_| PacketError::Encoding(format!("total length {total} overflows u16")))?;
                self.checksum = rfc1071_checksum(&self.to_bytes());
                Ok(self.to_bytes())
            }
        }
    }

    /// Reads the header at the start of a received datagram. Options, if
    /// any, are skipped; `header_len()` tells where the payload starts.
    pub fn parse(buffer: &[u8]) -> Result<Ipv4Header> {
        let packet = Ipv4Packet::new(buffer)
            .ok_or_else(|| PacketError::Parse(format!("{} bytes is too short for an IPv4 header", buffer.len())))?;

        if packet.get_version() != 4 {
            return Err(PacketError::Parse(format!("IP version {} is not 4", packet.get_version())));
        }
        let header_len = usize::from(packet.get_header_length()) * 4;
        if header_len < IPV4_HEADER_LEN || header_len > buffer.len() {
            return Err(PacketError::Parse(format!(
                "header length {header_len} invalid for a {} byte datagram",
                buffer.len()
            )));
        }

        Ok(Ipv4Header {
            version: packet.get_version(),
            ihl: packet.get_header_length(),
            tos: (packet.get_dscp() << 2) | packet.get_ecn(),
            total_length: packet.get_total_length(),
            identification: packet.get_identification(),
            flags: packet.get_flags(),
            frag_offset: packet.get_fragment_offset(),
            ttl: packet.get_ttl(),
            proto: packet.get_next_level_protocol().0,
            checksum: packet.get_checksum(),
            source_address: packet.get_source(),
            destination_address: packet.get_destination(),
        })
    }

    pub fn header_len(&self) -> usize {
        usize::from(self.ihl) * 4
    }
}
