//! Whole datagram assembly: IPv4 header followed by one transport segment.

use std::net::Ipv4Addr;
use tracing::debug;

use super::ip::{check_datagram_size, HeaderFill, IpProtocol, Ipv4Header};
use super::tcp::TcpSegment;
use super::udp::UdpDatagram;
use crate::error::{PacketError, Result};
use crate::hextools::format_hexdump;

/// A transport layer unit that can be encoded behind an IPv4 header
pub trait Transport {
    fn protocol(&self) -> IpProtocol;

    /// Header plus payload length in bytes
    fn encoded_len(&self) -> usize;

    /// Encodes header and payload with the checksum filled in
    fn encode(&self, source: &Ipv4Addr, destination: &Ipv4Addr) -> Result<Vec<u8>>;
}

/// Builds `IPv4 header || transport segment`. The size is checked before
/// anything is allocated.
pub fn build_packet<T: Transport + ?Sized>(
    source: &Ipv4Addr,
    destination: &Ipv4Addr,
    transport: &T,
    fill: HeaderFill,
) -> Result<Vec<u8>> {
    let transport_len = transport.encoded_len();
    let total = check_datagram_size(transport_len)?;

    let mut ip_header = Ipv4Header::new(*source, *destination, transport.protocol());
    let header_bytes = ip_header.pack(transport_len, fill)?;
    let segment = transport.encode(source, destination)?;

    let mut packet = Vec::with_capacity(total);
    packet.extend_from_slice(&header_bytes);
    packet.extend_from_slice(&segment);

    if packet.len() != total {
        return Err(PacketError::Encoding(format!(
            "assembled {} bytes, expected {total}",
            packet.len()
        )));
    }

    debug!(
        protocol = ?transport.protocol(),
        %source,
        %destination,
        len = total,
        "assembled datagram\n{}",
        format_hexdump(&packet)
    );

    Ok(packet)
}

pub fn build_tcp_packet(source: &Ipv4Addr, destination: &Ipv4Addr, segment: &TcpSegment) -> Result<Vec<u8>> {
    build_packet(source, destination, segment, HeaderFill::Computed)
}

pub fn build_udp_packet(source: &Ipv4Addr, destination: &Ipv4Addr, datagram: &UdpDatagram) -> Result<Vec<u8>> {
    build_packet(source, destination, datagram, HeaderFill::Computed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::checksum::verify;
    use crate::net::ip::{IPV4_HEADER_LEN, IPV4_MAX_DATAGRAM};
    use crate::net::tcp::{TcpFlags, TCP_HEADER_LEN};
    use crate::net::udp::UDP_HEADER_LEN;

    #[test]
    fn test_tcp_packet_layout() {
        let segment = TcpSegment::new(40704, 50000, 959585323)
            .with_ack(3102459363)
            .with_window(512)
            .with_flags(TcpFlags::PSH)
            .with_payload("xxx");
        let packet = build_tcp_packet(&Ipv4Addr::LOCALHOST, &Ipv4Addr::LOCALHOST, &segment).unwrap();

        assert_eq!(packet.len(), IPV4_HEADER_LEN + TCP_HEADER_LEN + 3);
        assert_eq!(&packet[..4], &[0x45, 0x00, 0x00, 0x2b]);
        assert_eq!(&packet[10..12], &[0xbd, 0xca]);
        assert!(verify(&packet[..IPV4_HEADER_LEN]));
        assert_eq!(&packet[36..38], &[0x88, 0xd0]);
        assert_eq!(&packet[40..], b"xxx");
    }

    #[test]
    fn test_udp_packet_layout() {
        let datagram = UdpDatagram::new(40000, 53, "abc");
        let source = Ipv4Addr::new(10, 0, 0, 1);
        let destination = Ipv4Addr::new(10, 0, 0, 2);
        let packet = build_udp_packet(&source, &destination, &datagram).unwrap();

        assert_eq!(packet.len(), IPV4_HEADER_LEN + UDP_HEADER_LEN + 3);
        assert_eq!(packet[9], 17);
        assert_eq!(&packet[10..12], &[0xa7, 0xcb]);
        assert_eq!(&packet[20..], &[0x9c, 0x40, 0x00, 0x35, 0x00, 0x0b, 0x8a, 0xfd, b'a', b'b', b'c']);
    }

    #[test]
    fn test_kernel_fill_leaves_length_and_checksum_zero() {
        let datagram = UdpDatagram::new(1, 2, "hi");
        let packet = build_packet(&Ipv4Addr::LOCALHOST, &Ipv4Addr::LOCALHOST, &datagram, HeaderFill::Kernel).unwrap();

        assert_eq!(&packet[2..4], &[0, 0]);
        assert_eq!(&packet[10..12], &[0, 0]);
        assert_eq!(packet.len(), IPV4_HEADER_LEN + UDP_HEADER_LEN + 2);
    }

    #[test]
    fn test_oversized_packet_is_rejected() {
        let datagram = UdpDatagram::new(1, 2, vec![0u8; IPV4_MAX_DATAGRAM]);
        match build_udp_packet(&Ipv4Addr::LOCALHOST, &Ipv4Addr::LOCALHOST, &datagram) {
            Err(PacketError::Size { size, max }) => {
                assert_eq!(size, IPV4_HEADER_LEN + UDP_HEADER_LEN + IPV4_MAX_DATAGRAM);
                assert_eq!(max, IPV4_MAX_DATAGRAM);
            }
            other => panic!("expected size error, got {other:?}"),
        }
    }

    #[test]
    fn test_trait_object_dispatch() {
        let units: Vec<Box<dyn Transport>> = vec![
            Box::new(TcpSegment::new(1, 2, 3)),
            Box::new(UdpDatagram::new(1, 2, "x")),
        ];
        let lengths: Vec<usize> = units
            .iter()
            .map(|unit| {
                build_packet(&Ipv4Addr::LOCALHOST, &Ipv4Addr::LOCALHOST, unit.as_ref(), HeaderFill::Computed)
                    .unwrap()
                    .len()
            })
            .collect();
        assert_eq!(lengths, vec![40, 29]);
    }
}
