//! TCP transport
//!
//! Messages are written back to back on one stream, each followed by a
//! single `0x00` delimiter. Writes block until the kernel accepts the bytes.

use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

use super::Transport;
use crate::constants::TCP_DELIMITER;

pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn connect(peer: SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect(peer)?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, packet: &[u8]) -> io::Result<()> {
        self.stream.write_all(packet)?;
        self.stream.write_all(&[TCP_DELIMITER])
    }

    fn send_parts(&mut self, parts: &[&[u8]]) -> io::Result<()> {
        for part in parts {
            self.stream.write_all(part)?;
        }
        self.stream.write_all(&[TCP_DELIMITER])
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn test_messages_are_null_delimited() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let reader = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut data = Vec::new();
            conn.read_to_end(&mut data).unwrap();
            data
        });

        let mut transport = TcpTransport::connect(addr).unwrap();
        transport.send(b"{\"a\":1}").unwrap();
        transport.send_parts(&[&b"{\"b\""[..], b":2}"]).unwrap();
        drop(transport);

        assert_eq!(reader.join().unwrap(), b"{\"a\":1}\0{\"b\":2}\0");
    }
}
