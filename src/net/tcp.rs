use bitflags::bitflags;
use std::net::Ipv4Addr;
use tracing::debug;

use super::ip::{check_datagram_size, IpProtocol};
use super::packet::Transport;
use super::pseudo::PseudoHeader;
use crate::error::Result;

/// Length of a TCP header without options
pub const TCP_HEADER_LEN: usize = 20;
pub const DEFAULT_WINDOW: u16 = 32768;
const CHECKSUM_OFFSET: usize = 16;

bitflags! {
    /// Control bits as laid out in byte 13 of the TCP header
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TcpFlags: u8 {
        const FIN = 0b0000_0001;
        const SYN = 0b0000_0010;
        const RST = 0b0000_0100;
        const PSH = 0b0000_1000;
        const ACK = 0b0001_0000;
        const URG = 0b0010_0000;
        const ECE = 0b0100_0000;
        const CWR = 0b1000_0000;
    }
}

impl TcpFlags {
    /// Flags a caller may set directly. ACK follows the acknowledgment
    /// number, URG/ECE/CWR are never sent.
    pub const CALLER: TcpFlags = TcpFlags::FIN
        .union(TcpFlags::SYN)
        .union(TcpFlags::RST)
        .union(TcpFlags::PSH);
}

/// A TCP segment with a fixed 20-byte header (no options) and its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSegment {
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence_number: u32,
    /// Zero means "no acknowledgment": the ACK flag is cleared
    pub ack_number: u32,
    pub window: u16,
    pub flags: TcpFlags,
    pub payload: Vec<u8>,
}

impl TcpSegment {
    pub fn new(source_port: u16, destination_port: u16, sequence_number: u32) -> Self {
        TcpSegment {
            source_port,
            destination_port,
            sequence_number,
            ack_number: 0,
            window: DEFAULT_WINDOW,
            flags: TcpFlags::empty(),
            payload: Vec::new(),
        }
    }

    pub fn with_ack(mut self, ack_number: u32) -> Self {
        self.ack_number = ack_number;
        self
    }

    pub fn with_window(mut self, window: u16) -> Self {
        self.window = window;
        self
    }

    pub fn with_flags(mut self, flags: TcpFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// The control bits that actually go on the wire.
    pub fn wire_flags(&self) -> TcpFlags {
        let mut flags = self.flags & TcpFlags::CALLER;
        flags.set(TcpFlags::ACK, self.ack_number != 0);
        flags
    }

    /// Header in network byte order with the given checksum value.
    pub fn pack_header(&self, checksum: u16) -> [u8; TCP_HEADER_LEN] {
        let mut header = [0u8; TCP_HEADER_LEN];
        let flags = self.wire_flags();
        let ack_number = if flags.contains(TcpFlags::ACK) { self.ack_number } else { 0 };

        header[0..2].copy_from_slice(&self.source_port.to_be_bytes());
        header[2..4].copy_from_slice(&self.destination_port.to_be_bytes());
        header[4..8].copy_from_slice(&self.sequence_number.to_be_bytes());
        header[8..12].copy_from_slice(&ack_number.to_be_bytes());
        // Data offset in the high nibble, reserved bits zero
        header[12] = ((TCP_HEADER_LEN / 4) as u8) << 4;
        header[13] = flags.bits();
        header[14..16].copy_from_slice(&self.window.to_be_bytes());
        header[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_be_bytes());
        // Urgent pointer stays zero

        header
    }
}

impl Transport for TcpSegment {
    fn protocol(&self) -> IpProtocol {
        IpProtocol::Tcp
    }

    fn encoded_len(&self) -> usize {
        TCP_HEADER_LEN + self.payload.len()
    }

    /// Header followed by payload, checksum computed over the
    /// pseudo-header and the segment with its checksum field zeroed.
    fn encode(&self, source: &Ipv4Addr, destination: &Ipv4Addr) -> Result<Vec<u8>> {
        let segment_len = self.encoded_len();
        check_datagram_size(segment_len)?;
        let pseudo = PseudoHeader::new(*source, *destination, IpProtocol::Tcp, segment_len)?;

        let mut segment = Vec::with_capacity(segment_len);
        segment.extend_from_slice(&self.pack_header(0));
        segment.extend_from_slice(&self.payload);

        let checksum = pseudo.checksum(&segment)?;
        segment[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_be_bytes());
        debug!(
            source_port = self.source_port,
            destination_port = self.destination_port,
            flags = ?self.wire_flags(),
            len = segment_len,
            "TCP checksum 0x{checksum:04x}"
        );

        Ok(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PacketError;
    use crate::net::checksum::Checksum;
    use crate::net::ip::{IPV4_HEADER_LEN, IPV4_MAX_DATAGRAM};
    use pnet_packet::ip::IpNextHeaderProtocols;
    use pnet_packet::tcp::TcpPacket;
    use pnet_packet::util::ipv4_checksum;
    use pnet_packet::Packet;
    use proptest::prelude::*;

    fn sample_segment() -> TcpSegment {
        TcpSegment::new(40704, 50000, 959585323)
            .with_ack(3102459363)
            .with_window(512)
            .with_flags(TcpFlags::PSH)
            .with_payload("xxx")
    }

    #[test]
    fn test_tcp_segment_encode() {
        // 127.0.0.1 -> 127.0.0.1, PSH+ACK carrying "xxx"
        let expected: Vec<u8> = vec![
            0x9f, 0x00, // Source Port (40704)
            0xc3, 0x50, // Destination Port (50000)
            0x39, 0x32, 0x1c, 0x2b, // Sequence Number (959585323)
            0xb8, 0xeb, 0xc5, 0xe3, // Ack Number (3102459363)
            0x50, // Data Offset: 5 << 4
            0x18, // Flags: PSH + ACK
            0x02, 0x00, // Window (512)
            0x88, 0xd0, // Checksum
            0x00, 0x00, // Urgent Pointer
            b'x', b'x', b'x',
        ];

        let encoded = sample_segment()
            .encode(&Ipv4Addr::LOCALHOST, &Ipv4Addr::LOCALHOST)
            .unwrap();

        assert_eq!(encoded, expected, "Encoded TCP segment did not match expected output");
    }

    #[test]
    fn test_zero_ack_clears_ack_flag() {
        let segment = TcpSegment::new(1234, 80, 1)
            .with_flags(TcpFlags::SYN | TcpFlags::ACK | TcpFlags::URG)
            .with_ack(0);
        let encoded = segment.encode(&Ipv4Addr::LOCALHOST, &Ipv4Addr::LOCALHOST).unwrap();

        assert_eq!(&encoded[8..12], &[0, 0, 0, 0]);
        assert_eq!(encoded[13], TcpFlags::SYN.bits());
    }

    #[test]
    fn test_nonzero_ack_sets_ack_flag() {
        let segment = TcpSegment::new(1234, 80, 1).with_ack(7);
        assert_eq!(segment.wire_flags(), TcpFlags::ACK);
        assert_eq!(&segment.pack_header(0)[8..12], &7u32.to_be_bytes());
    }

    #[test]
    fn test_every_caller_flag() {
        let segment = TcpSegment::new(1, 2, 3)
            .with_flags(TcpFlags::FIN | TcpFlags::SYN | TcpFlags::RST | TcpFlags::PSH);
        assert_eq!(segment.pack_header(0)[13], 0x0f);
    }

    #[test]
    fn test_defaults() {
        let header = TcpSegment::new(1, 2, 3).pack_header(0);
        assert_eq!(&header[14..16], &32768u16.to_be_bytes());
        assert_eq!(header[12], 0x50);
        assert_eq!(&header[18..20], &[0, 0]);
    }

    #[test]
    fn test_pnet_reads_encoded_segment() {
        let encoded = sample_segment()
            .encode(&Ipv4Addr::LOCALHOST, &Ipv4Addr::LOCALHOST)
            .unwrap();
        let packet = TcpPacket::new(&encoded).unwrap();

        assert_eq!(packet.get_source(), 40704);
        assert_eq!(packet.get_destination(), 50000);
        assert_eq!(packet.get_sequence(), 959585323);
        assert_eq!(packet.get_acknowledgement(), 3102459363);
        assert_eq!(packet.get_data_offset(), 5);
        assert_eq!(packet.get_window(), 512);
        assert_eq!(packet.get_urgent_ptr(), 0);
        assert_eq!(packet.payload(), b"xxx");
    }

    #[test]
    fn test_oversized_segment_is_rejected() {
        let payload = vec![0u8; IPV4_MAX_DATAGRAM - IPV4_HEADER_LEN - TCP_HEADER_LEN + 1];
        let segment = TcpSegment::new(1, 2, 3).with_payload(payload);

        assert!(matches!(
            segment.encode(&Ipv4Addr::LOCALHOST, &Ipv4Addr::LOCALHOST),
            Err(PacketError::Size { size: 65536, .. })
        ));
    }

    #[test]
    fn test_largest_segment_is_accepted() {
        let payload = vec![0xa5u8; IPV4_MAX_DATAGRAM - IPV4_HEADER_LEN - TCP_HEADER_LEN];
        let segment = TcpSegment::new(1, 2, 3).with_payload(payload);
        let encoded = segment.encode(&Ipv4Addr::LOCALHOST, &Ipv4Addr::LOCALHOST).unwrap();
        assert_eq!(encoded.len(), IPV4_MAX_DATAGRAM - IPV4_HEADER_LEN);
    }

    proptest! {
        #[test]
        fn checksum_agrees_with_pnet_and_verifies(
            source in any::<u32>(),
            destination in any::<u32>(),
            source_port in any::<u16>(),
            destination_port in any::<u16>(),
            sequence in any::<u32>(),
            ack in any::<u32>(),
            flags in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..300usize),
        ) {
            let source = Ipv4Addr::from(source);
            let destination = Ipv4Addr::from(destination);
            let segment = TcpSegment::new(source_port, destination_port, sequence)
                .with_ack(ack)
                .with_flags(TcpFlags::from_bits_truncate(flags))
                .with_payload(payload);

            let encoded = segment.encode(&source, &destination).unwrap();
            let stored = u16::from_be_bytes([encoded[16], encoded[17]]);
            let reference = ipv4_checksum(&encoded, 8, &[], &source, &destination, IpNextHeaderProtocols::Tcp);
            prop_assert_eq!(stored, reference);

            let pseudo = PseudoHeader::new(source, destination, IpProtocol::Tcp, encoded.len()).unwrap();
            let mut sum = Checksum::new();
            sum.add_bytes(&pseudo.to_bytes()).add_bytes(&encoded);
            prop_assert_eq!(sum.finish(), 0);
        }

        #[test]
        fn encoding_is_deterministic(
            sequence in any::<u32>(),
            payload in proptest::collection::vec(any::<u8>(), 0..64usize),
        ) {
            let segment = TcpSegment::new(4000, 80, sequence).with_payload(payload);
            let first = segment.encode(&Ipv4Addr::LOCALHOST, &Ipv4Addr::BROADCAST).unwrap();
            let second = segment.clone().encode(&Ipv4Addr::LOCALHOST, &Ipv4Addr::BROADCAST).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
