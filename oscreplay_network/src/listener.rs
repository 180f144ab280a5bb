//! Receiving side of the transport.

use crate::{NetworkError, OscUrl};
use core::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use log::warn;
use oscreplay_proto::{Packet, RawMessage, Timetag};
use std::io;

/// How long a receive blocks before the stop flag is checked again.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Large enough for any UDP datagram.
const RECV_BUF_LEN: usize = 1 << 16;

/// Bundles nested deeper than this are dropped.
const MAX_NESTING: usize = 64;

/// Callbacks describing the contents of incoming datagrams.
///
/// A bundle produces [`on_group_start`](GroupListener::on_group_start), then one
/// callback per element, then [`on_group_end`](GroupListener::on_group_end).
/// Bundles nested in other bundles produce nested start/end pairs. A datagram
/// holding a single message only produces [`on_message`](GroupListener::on_message).
///
/// Errors returned by a callback stop the receive loop.
pub trait GroupListener {
    fn on_group_start(&mut self, timestamp: Timetag) -> io::Result<()>;

    /// `payload` is the whole encoded message, address pattern included.
    fn on_message(&mut self, address: &str, payload: &[u8]) -> io::Result<()>;

    fn on_group_end(&mut self) -> io::Result<()>;
}

/// A UDP socket receiving datagrams from any sender.
#[derive(Debug)]
pub struct Listener {
    sock: std::net::UdpSocket,
}

impl Listener {
    /// Wraps `sock`, setting the read timeout used to poll the stop flag.
    pub fn new(sock: std::net::UdpSocket) -> io::Result<Self> {
        sock.set_read_timeout(Some(READ_TIMEOUT))?;
        Ok(Self { sock })
    }

    /// Binds the address of `url`.
    pub fn bind(url: &OscUrl) -> Result<Self, NetworkError> {
        std::net::UdpSocket::bind(url.listen_addr())
            .and_then(Self::new)
            .map_err(|source| NetworkError::Socket {
                url: url.clone(),
                source,
            })
    }

    #[inline(always)]
    pub fn local_addr(&self) -> io::Result<core::net::SocketAddr> {
        self.sock.local_addr()
    }

    /// Runs the receive loop until `stop` is set, reporting every datagram to `state`.
    ///
    /// Returns early if receiving fails, or if a callback returns an error.
    pub fn run(&self, state: &mut impl GroupListener, stop: &AtomicBool) -> io::Result<()> {
        let mut buf = vec![0; RECV_BUF_LEN];

        while !stop.load(Ordering::Relaxed) {
            let res = self.sock.recv_from(&mut buf);

            // don't return on timeout errors...
            let (n, peer) = match res {
                Ok(r) => r,
                Err(e) if crate::io_err_is_timeout(e.kind()) => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            log::trace!("{n} byte datagram from {peer}");

            dispatch_packet(&buf[..n], state)?;
        }

        Ok(())
    }
}

/// Walks one datagram, reporting what it contains to `state`.
///
/// Malformed messages and packets are dropped with a warning. A bundle whose
/// framing breaks partway keeps the elements before the damage.
pub fn dispatch_packet(bytes: &[u8], state: &mut impl GroupListener) -> io::Result<()> {
    dispatch_nested(bytes, state, 0)
}

fn dispatch_nested(bytes: &[u8], state: &mut impl GroupListener, depth: usize) -> io::Result<()> {
    let packet = match Packet::decode(bytes) {
        Ok(p) => p,
        Err(e) => {
            warn!("dropping malformed packet: {e}");
            return Ok(());
        }
    };

    match packet {
        Packet::Message(bytes) => match RawMessage::decode(bytes) {
            Ok(message) => state.on_message(message.address(), message.payload()),
            Err(e) => {
                warn!("dropping malformed message: {e}");
                Ok(())
            }
        },

        Packet::Bundle(_, _) if depth >= MAX_NESTING => {
            warn!("dropping bundle nested more than {MAX_NESTING} levels deep");
            Ok(())
        }

        Packet::Bundle(timestamp, elements) => {
            state.on_group_start(timestamp)?;

            for element in elements {
                match element {
                    Ok(element) => dispatch_nested(element, state, depth.strict_add(1))?,
                    Err(e) => {
                        warn!("bundle {timestamp} cut short: {e}");
                        break;
                    }
                }
            }

            state.on_group_end()
        }
    }
}
