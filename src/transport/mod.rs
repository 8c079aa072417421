//! Wire transport for remote log collectors
//!
//! Separates byte delivery from envelope encoding:
//! - **Transport**: how packets leave the process (UDP datagrams, TCP stream)
//! - **Chunking / compression**: how an encoded message is shaped for UDP
//!
//! Remote addresses are written `scheme://host:port`; the scheme selects the
//! transport and defaults to `udp`.

pub mod chunk;
pub mod compress;
pub mod tcp;
pub mod udp;

pub use chunk::{chunk_count, send_chunked, ChunkHeader, Chunks};
pub use compress::{compress, CompressType};
pub use tcp::TcpTransport;
pub use udp::UdpTransport;

use std::fmt;
use std::io;
use std::io::IoSlice;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::str::FromStr;

use crate::error::{LogError, Result};

/// Packet sink owned by one channel
///
/// A transport only moves bytes. It does not encode, retry or reconnect;
/// that is the owning channel's job.
pub trait Transport: Send {
    /// Send one packet (a datagram for UDP, a framed message for TCP)
    fn send(&mut self, packet: &[u8]) -> io::Result<()>;

    /// Send one packet assembled from several slices
    fn send_parts(&mut self, parts: &[&[u8]]) -> io::Result<()> {
        let packet = parts.concat();
        self.send(&packet)
    }
}

// =============================================================================
// Remote address
// =============================================================================

/// Transport selected by the address scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Udp,
    Tcp,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Udp => "udp",
            Scheme::Tcp => "tcp",
        }
    }
}

/// Parsed `scheme://host:port`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAddr {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl RemoteAddr {
    /// Resolve to the first socket address
    pub fn resolve(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| LogError::InvalidAddress {
                addr: self.to_string(),
            })
    }

    /// Open the transport named by the scheme
    pub fn connect(&self) -> Result<Box<dyn Transport>> {
        let addr = self.resolve()?;
        let map_err = |e| LogError::Connect {
            addr: self.to_string(),
            source: e,
        };
        Ok(match self.scheme {
            Scheme::Udp => Box::new(UdpTransport::connect(addr).map_err(map_err)?),
            Scheme::Tcp => Box::new(TcpTransport::connect(addr).map_err(map_err)?),
        })
    }
}

impl FromStr for RemoteAddr {
    type Err = LogError;

    fn from_str(url: &str) -> Result<Self> {
        let invalid = || LogError::InvalidAddress {
            addr: url.to_string(),
        };
        let (scheme, rest) = match url.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => ("udp", url),
        };
        let scheme = match scheme.to_ascii_lowercase().as_str() {
            "udp" => Scheme::Udp,
            "tcp" => Scheme::Tcp,
            _ => {
                return Err(LogError::UnsupportedScheme {
                    scheme: scheme.to_string(),
                })
            }
        };

        let (host, port) = rest.rsplit_once(':').ok_or_else(invalid)?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for RemoteAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.scheme.as_str(), self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.scheme.as_str(), self.host, self.port)
        }
    }
}

// =============================================================================
// Local host discovery
// =============================================================================

/// First non-loopback IPv4 address of this machine
///
/// Connecting a UDP socket only selects a route; nothing is sent.
pub fn local_ipv4() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("192.0.2.1:9").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (ip.is_ipv4() && !ip.is_loopback() && !ip.is_unspecified()).then_some(ip)
}

/// Write all `parts` as one vectored send, failing on a short write
pub(crate) fn write_vectored_all(
    parts: &[&[u8]],
    send: impl FnOnce(&[IoSlice<'_>]) -> io::Result<usize>,
) -> io::Result<()> {
    let slices: Vec<IoSlice<'_>> = parts.iter().map(|p| IoSlice::new(p)).collect();
    let expected: usize = parts.iter().map(|p| p.len()).sum();
    let sent = send(&slices)?;
    if sent != expected {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short send: {}/{} bytes", sent, expected),
        ));
    }
    Ok(())
}
