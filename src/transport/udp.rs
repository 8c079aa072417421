//! UDP transport
//!
//! A connected datagram socket: one `send` is one datagram. The socket is
//! created through socket2 so chunk header and payload can go out in a single
//! vectored send without copying them together.

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use super::{write_vectored_all, Transport};

pub struct UdpTransport {
    socket: Socket,
    peer: SocketAddr,
}

impl UdpTransport {
    /// Bind an ephemeral local port and connect it to `peer`
    pub fn connect(peer: SocketAddr) -> io::Result<Self> {
        let socket = Socket::new(Domain::for_address(peer), Type::DGRAM, Some(Protocol::UDP))?;
        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        socket.bind(&SockAddr::from(local))?;
        socket.connect(&SockAddr::from(peer))?;
        Ok(Self { socket, peer })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, packet: &[u8]) -> io::Result<()> {
        write_vectored_all(&[packet], |bufs| self.socket.send_vectored(bufs))
    }

    fn send_parts(&mut self, parts: &[&[u8]]) -> io::Result<()> {
        write_vectored_all(parts, |bufs| self.socket.send_vectored(bufs))
    }
}
