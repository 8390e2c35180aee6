//! Raw IPv4 sockets. Opening them needs CAP_NET_RAW.

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::mem::MaybeUninit;
use std::net::{Ipv4Addr, SocketAddrV4};
use tracing::{debug, info};

use super::ip::{Ipv4Header, IPV4_MAX_DATAGRAM};
use crate::error::Result;

/// Sends datagrams that already carry their own IPv4 header
pub struct RawSender {
    socket: Socket,
}

impl RawSender {
    /// `socket(AF_INET, SOCK_RAW, IPPROTO_RAW)` with IP_HDRINCL set.
    pub fn open() -> Result<Self> {
        let socket = Socket::new_raw(Domain::IPV4, Type::RAW, Some(Protocol::from(libc::IPPROTO_RAW)))?;
        // Implied by IPPROTO_RAW on Linux, set anyway for other kernels
        socket.set_header_included_v4(true)?;
        debug!("raw send socket opened");
        Ok(RawSender { socket })
    }

    /// The kernel still needs `destination` to pick a route and build the
    /// link layer header, even though the datagram names it too.
    pub fn send(&self, datagram: &[u8], destination: Ipv4Addr) -> Result<usize> {
        let address = SockAddr::from(SocketAddrV4::new(destination, 0));
        let sent = self.socket.send_to(datagram, &address)?;
        info!(%destination, bytes = sent, "sent datagram");
        Ok(sent)
    }
}

/// One datagram as handed up by a raw receive socket
#[derive(Debug, Clone)]
pub struct ReceivedDatagram {
    /// Address reported by recvfrom
    pub peer: Option<Ipv4Addr>,
    pub header: Ipv4Header,
    /// Everything after the IPv4 header, transport header included
    pub payload: Vec<u8>,
}

impl ReceivedDatagram {
    /// Splits a received datagram into its header and everything after it,
    /// honouring the IHL so IP options are skipped.
    pub fn from_bytes(bytes: &[u8], peer: Option<Ipv4Addr>) -> Result<ReceivedDatagram> {
        let header = Ipv4Header::parse(bytes)?;
        let payload = bytes[header.header_len()..].to_vec();
        Ok(ReceivedDatagram { peer, header, payload })
    }
}

/// Receives whole IPv4 datagrams of one protocol
pub struct RawReceiver {
    socket: Socket,
    buffer: Vec<MaybeUninit<u8>>,
}

impl RawReceiver {
    pub fn open(protocol: u8) -> Result<Self> {
        let socket = Socket::new_raw(Domain::IPV4, Type::RAW, Some(Protocol::from(i32::from(protocol))))?;
        debug!(protocol, "raw receive socket opened");
        Ok(RawReceiver {
            socket,
            buffer: vec![MaybeUninit::uninit(); IPV4_MAX_DATAGRAM],
        })
    }

    /// Blocks until the next datagram arrives.
    pub fn recv(&mut self) -> Result<ReceivedDatagram> {
        let (received, address) = self.socket.recv_from(&mut self.buffer)?;
        // SAFETY: recv_from initialised the first `received` bytes.
        let bytes: &[u8] = unsafe { std::slice::from_raw_parts(self.buffer.as_ptr() as *const u8, received) };

        let peer = address.as_socket_ipv4().map(|socket| *socket.ip());
        debug!(bytes = received, ?peer, "received datagram");

        ReceivedDatagram::from_bytes(bytes, peer)
    }
}
