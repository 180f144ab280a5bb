//! OSC transport for the recorder and the player.
//!
//! This crate moves groups and messages over UDP sockets, using the wire form
//! defined in `oscreplay_proto`. It does not store, schedule or aggregate
//! anything itself.
//!
//! ## Scope
//!
//! - Parsing `osc.udp://host:port` endpoint URLs
//! - Sending groups (as bundles) and single messages to one destination
//! - A receive loop that walks incoming datagrams and reports what they contain
//!   through the [`GroupListener`] callbacks
//!
//! Only UDP is supported. Other OSC transports are rejected when parsing URLs.

pub mod destination;
pub mod listener;
pub mod url;

pub use destination::Destination;
pub use listener::{GroupListener, Listener, dispatch_packet};
pub use oscreplay_proto;
pub use url::{OscUrl, UrlError};

/// Errors raised while setting up a socket.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error(transparent)]
    Url(#[from] UrlError),
    #[error("cannot resolve {url}: {source}")]
    Resolve {
        url: OscUrl,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} resolves to no address")]
    NoAddress(OscUrl),
    #[error("cannot open a socket for {url}: {source}")]
    Socket {
        url: OscUrl,
        #[source]
        source: std::io::Error,
    },
}

/// Returns `true` if the given I/O error kind represents a timeout condition.
///
/// This treats both `WouldBlock` and `TimedOut` as timeout-equivalent, since
/// platforms disagree on which one a socket read timeout produces.
#[inline(always)]
pub(crate) fn io_err_is_timeout(e: std::io::ErrorKind) -> bool {
    use std::io::ErrorKind::*;
    [WouldBlock, TimedOut].contains(&e)
}
