//! Sending side of the transport.

use crate::{NetworkError, OscUrl};
use core::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use oscreplay_proto::{Group, RawMessage, packet};
use std::{io, net::ToSocketAddrs};

/// A UDP socket bound to an ephemeral port, sending to one fixed address.
#[derive(Debug)]
pub struct Destination {
    sock: std::net::UdpSocket,
    addr: SocketAddr,
    encode_buf: Vec<u8>,
}

impl Destination {
    /// Creates a destination sending through `sock` to `addr`.
    #[inline(always)]
    pub fn new(sock: std::net::UdpSocket, addr: SocketAddr) -> Self {
        Self {
            sock,
            addr,
            encode_buf: Vec::new(),
        }
    }

    /// Resolves `url` and opens a socket to send to it.
    ///
    /// Resolution happens once, here. The first address found is used.
    pub fn connect(url: &OscUrl) -> Result<Self, NetworkError> {
        let addr = url
            .send_addr()
            .to_socket_addrs()
            .map_err(|source| NetworkError::Resolve {
                url: url.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| NetworkError::NoAddress(url.clone()))?;

        let local = if addr.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };

        let sock = std::net::UdpSocket::bind(local).map_err(|source| NetworkError::Socket {
            url: url.clone(),
            source,
        })?;

        log::debug!("sending to {addr} ({url})");

        Ok(Self::new(sock, addr))
    }

    #[inline(always)]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Sends `group` as a single bundle datagram.
    pub fn send_group(&mut self, group: &Group) -> io::Result<()> {
        let len = packet::encode_group(group, &mut self.encode_buf)?;
        let res = self.sock.send_to(&self.encode_buf, self.addr);
        check_sent(res, len)
    }

    /// Sends `message` on its own, outside of any bundle.
    #[inline]
    pub fn send_message(&self, message: &RawMessage) -> io::Result<()> {
        let res = self.sock.send_to(message.payload(), self.addr);
        check_sent(res, message.len())
    }
}

#[inline(always)]
fn check_sent(res: io::Result<usize>, len: usize) -> io::Result<()> {
    res.and_then(|n| {
        (n == len)
            .then_some(())
            .ok_or(io::ErrorKind::FileTooLarge.into())
    })
}
