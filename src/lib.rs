//! Builds raw IPv4 datagrams carrying a TCP segment or a UDP datagram,
//! with every checksum filled in, ready for a raw socket.
//!
//! ```no_run
//! use rawsend::net::packet::build_udp_packet;
//! use rawsend::net::raw::RawSender;
//! use rawsend::net::resolve::resolve_ipv4;
//! use rawsend::net::udp::UdpDatagram;
//!
//! # fn main() -> rawsend::error::Result<()> {
//! let source = resolve_ipv4("192.0.2.1")?;
//! let destination = resolve_ipv4("192.0.2.53")?;
//! let datagram = UdpDatagram::new(40000, 53, "abc");
//! let packet = build_udp_packet(&source, &destination, &datagram)?;
//! RawSender::open()?.send(&packet, destination)?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod error;
pub mod hextools;
pub mod net;

pub use error::{PacketError, Result};
pub use net::ip::HeaderFill;
pub use net::packet::{build_packet, build_tcp_packet, build_udp_packet, Transport};
pub use net::tcp::{TcpFlags, TcpSegment};
pub use net::udp::UdpDatagram;
